//! Course codes, per-guild course settings and channel bookkeeping rules
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! Nothing here touches Discord or the store. A course `CSSE1001` lives in
//! the text channel `csse1001`, inside the category `CSSE`.

use crate::core::CourseError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Four capital ASCII letters
fn is_descriptor(text: &str) -> bool {
    text.len() == 4 && text.bytes().all(|b| b.is_ascii_uppercase())
}

/// A course code such as `CSSE1001`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CourseCode {
    descriptor: String,
    number: String,
}

impl CourseCode {
    /// Parse user input; case-insensitive, surrounding whitespace ignored
    pub fn parse(raw: &str) -> Result<Self, CourseError> {
        let trimmed = raw.trim();
        let well_formed = trimmed.len() == 8
            && trimmed.bytes().take(4).all(|b| b.is_ascii_alphabetic())
            && trimmed.bytes().skip(4).all(|b| b.is_ascii_digit());
        if !well_formed {
            return Err(CourseError::InvalidCode(trimmed.to_string()));
        }

        // all ASCII, so byte 4 is a char boundary
        let (descriptor, number) = trimmed.split_at(4);
        Ok(Self {
            descriptor: descriptor.to_ascii_uppercase(),
            number: number.to_string(),
        })
    }

    /// Four-letter discipline, upper case (`CSSE`)
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Text channel name (`csse1001`)
    pub fn channel_name(&self) -> String {
        format!("{}{}", self.descriptor.to_ascii_lowercase(), self.number)
    }

    /// Category holding every course of this descriptor (`CSSE`)
    pub fn category_name(&self) -> &str {
        &self.descriptor
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.descriptor, self.number)
    }
}

/// Descriptor of a channel or category name, if it names a course space
///
/// Text channels must be full course codes; categories are bare descriptors.
pub fn descriptor_of(name: &str, is_category: bool) -> Option<String> {
    if is_category {
        let upper = name.to_ascii_uppercase();
        is_descriptor(&upper).then_some(upper)
    } else {
        CourseCode::parse(name).ok().map(|code| code.descriptor)
    }
}

/// Parse `/setup_course codes:` input such as `CSSE,COMP, MATH`
///
/// Each entry must be exactly four capital letters. Duplicates are dropped,
/// order is kept.
pub fn parse_descriptors(raw: &str) -> Result<Vec<String>, CourseError> {
    let mut seen = HashSet::new();
    let mut descriptors = Vec::new();
    for part in raw.split(',').map(str::trim) {
        if !is_descriptor(part) {
            return Err(CourseError::InvalidDescriptors(raw.trim().to_string()));
        }
        if seen.insert(part) {
            descriptors.push(part.to_string());
        }
    }
    Ok(descriptors)
}

/// Per-guild course settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseConfig {
    pub guild_id: u64,
    /// Delete a course channel when its last member drops it
    pub auto_delete: bool,
    /// Administrators do not keep a channel alive
    pub auto_delete_ignore_admins: bool,
    /// Descriptors members may enrol in (`CSSE`, `COMP`, ...)
    pub descriptors: Vec<String>,
}

/// Changes requested through `/setup_course`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseConfigUpdate {
    pub auto_delete: Option<bool>,
    pub auto_delete_ignore_admins: Option<bool>,
    pub codes: Option<String>,
}

impl CourseConfig {
    pub fn defaults(guild_id: u64) -> Self {
        Self {
            guild_id,
            auto_delete: true,
            auto_delete_ignore_admins: false,
            descriptors: Vec::new(),
        }
    }

    /// Merge an update, rejecting malformed descriptor lists
    pub fn apply(&self, update: &CourseConfigUpdate) -> Result<CourseConfig, CourseError> {
        let mut next = self.clone();
        if let Some(auto_delete) = update.auto_delete {
            next.auto_delete = auto_delete;
        }
        if let Some(ignore_admins) = update.auto_delete_ignore_admins {
            next.auto_delete_ignore_admins = ignore_admins;
        }
        if let Some(codes) = update.codes.as_deref().filter(|c| !c.trim().is_empty()) {
            next.descriptors = parse_descriptors(codes)?;
        }
        Ok(next)
    }

    pub fn allows(&self, code: &CourseCode) -> bool {
        self.is_course_descriptor(code.descriptor())
    }

    pub fn is_course_descriptor(&self, name: &str) -> bool {
        self.descriptors.iter().any(|d| d == name)
    }

    /// Reject codes whose descriptor this guild does not offer
    pub fn check_allowed(&self, code: &CourseCode) -> Result<(), CourseError> {
        if self.allows(code) {
            Ok(())
        } else {
            Err(CourseError::DescriptorNotAllowed {
                descriptor: code.descriptor().to_string(),
                allowed: self.descriptors.clone(),
            })
        }
    }
}

/// Kind of a guild channel, as far as courses care
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Category,
    Other,
}

/// Snapshot of one live guild channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: u64,
    pub name: String,
    pub kind: ChannelKind,
    pub parent_id: Option<u64>,
}

/// Someone who can see a course channel through a member overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMember {
    pub user_id: u64,
    pub bot: bool,
    pub admin: bool,
}

/// Members that count as enrolled: people, not bots or administrators
pub fn enrolled_members(members: &[ChannelMember]) -> Vec<u64> {
    members
        .iter()
        .filter(|m| !m.bot && !m.admin)
        .map(|m| m.user_id)
        .collect()
}

/// Whether a channel left with `remaining` members should be deleted
pub fn should_auto_delete(config: &CourseConfig, remaining: &[ChannelMember]) -> bool {
    config.auto_delete
        && !remaining
            .iter()
            .any(|m| !m.bot && !(config.auto_delete_ignore_admins && m.admin))
}

/// Index that keeps `existing` plus `name` in alphabetical order
pub fn insert_position<'a>(existing: impl IntoIterator<Item = &'a str>, name: &str) -> u32 {
    existing.into_iter().filter(|other| *other < name).count() as u32
}

/// Position for a new course category
///
/// Course categories sort alphabetically after every other category.
pub fn category_position(channels: &[ChannelInfo], config: &CourseConfig, name: &str) -> u32 {
    let categories: Vec<&ChannelInfo> = channels
        .iter()
        .filter(|c| c.kind == ChannelKind::Category)
        .collect();
    let course_names = categories
        .iter()
        .filter(|c| config.is_course_descriptor(&c.name))
        .map(|c| c.name.as_str());
    let others = categories
        .iter()
        .filter(|c| !config.is_course_descriptor(&c.name))
        .count() as u32;
    others + insert_position(course_names, name)
}

/// Position for a new course channel inside `category`
pub fn channel_position(channels: &[ChannelInfo], category: u64, name: &str) -> u32 {
    insert_position(
        channels
            .iter()
            .filter(|c| c.kind == ChannelKind::Text && c.parent_id == Some(category))
            .map(|c| c.name.as_str()),
        name,
    )
}

/// Text channels sitting in one of the guild's course categories
pub fn course_text_channels<'a>(
    channels: &'a [ChannelInfo],
    config: &CourseConfig,
) -> Vec<&'a ChannelInfo> {
    let course_categories: HashSet<u64> = channels
        .iter()
        .filter(|c| c.kind == ChannelKind::Category && config.is_course_descriptor(&c.name))
        .map(|c| c.id)
        .collect();
    channels
        .iter()
        .filter(|c| {
            c.kind == ChannelKind::Text
                && c.parent_id.is_some_and(|p| course_categories.contains(&p))
        })
        .collect()
}

/// Bookkeeping row for a channel or category the bot manages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseChannelRow {
    pub channel_id: u64,
    pub guild_id: u64,
    pub name: String,
    pub is_category: bool,
    /// Skipped by `/course reset_all`
    pub do_not_reset: bool,
}

impl CourseChannelRow {
    pub fn new(guild_id: u64, channel: &ChannelInfo) -> Self {
        Self {
            channel_id: channel.id,
            guild_id,
            name: channel.name.clone(),
            is_category: channel.kind == ChannelKind::Category,
            do_not_reset: false,
        }
    }
}

/// A live channel as seen by `/course sync`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveCourseChannel {
    pub channel: ChannelInfo,
    /// Enrolled members (see `enrolled_members`); empty for categories
    pub members: Vec<u64>,
}

/// Store changes that bring course bookkeeping in line with the guild
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub removed_channels: Vec<u64>,
    pub renamed_channels: Vec<(u64, String)>,
    pub added_channels: Vec<CourseChannelRow>,
    /// `(channel_id, user_id)`
    pub removed_enrollments: Vec<(u64, u64)>,
    /// `(channel_id, user_id)`
    pub added_enrollments: Vec<(u64, u64)>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.removed_channels.is_empty()
            && self.renamed_channels.is_empty()
            && self.added_channels.is_empty()
            && self.removed_enrollments.is_empty()
            && self.added_enrollments.is_empty()
    }
}

/// Compare stored bookkeeping with the live guild
///
/// Stored rows whose channel is gone are dropped with their enrollments.
/// Surviving rows follow the live name and member list. Live course
/// channels without a row are adopted along with their members.
pub fn plan_sync(
    guild_id: u64,
    stored: &[CourseChannelRow],
    stored_enrollments: &HashMap<u64, Vec<u64>>,
    live: &[LiveCourseChannel],
) -> SyncPlan {
    let live_by_id: HashMap<u64, &LiveCourseChannel> =
        live.iter().map(|l| (l.channel.id, l)).collect();
    let stored_ids: HashSet<u64> = stored.iter().map(|row| row.channel_id).collect();
    let mut plan = SyncPlan::default();

    for row in stored {
        let Some(current) = live_by_id.get(&row.channel_id) else {
            plan.removed_channels.push(row.channel_id);
            continue;
        };
        if current.channel.name != row.name {
            plan.renamed_channels
                .push((row.channel_id, current.channel.name.clone()));
        }
        if row.is_category {
            continue;
        }

        let enrolled = stored_enrollments
            .get(&row.channel_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for user in enrolled {
            if !current.members.contains(user) {
                plan.removed_enrollments.push((row.channel_id, *user));
            }
        }
        for user in &current.members {
            if !enrolled.contains(user) {
                plan.added_enrollments.push((row.channel_id, *user));
            }
        }
    }

    for adopted in live.iter().filter(|l| !stored_ids.contains(&l.channel.id)) {
        plan.added_channels
            .push(CourseChannelRow::new(guild_id, &adopted.channel));
        for user in &adopted.members {
            plan.added_enrollments.push((adopted.channel.id, *user));
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(descriptors: &[&str]) -> CourseConfig {
        CourseConfig {
            descriptors: descriptors.iter().map(|d| d.to_string()).collect(),
            ..CourseConfig::defaults(1)
        }
    }

    fn category(id: u64, name: &str) -> ChannelInfo {
        ChannelInfo {
            id,
            name: name.to_string(),
            kind: ChannelKind::Category,
            parent_id: None,
        }
    }

    fn text(id: u64, name: &str, parent: Option<u64>) -> ChannelInfo {
        ChannelInfo {
            id,
            name: name.to_string(),
            kind: ChannelKind::Text,
            parent_id: parent,
        }
    }

    fn member(user_id: u64, bot: bool, admin: bool) -> ChannelMember {
        ChannelMember {
            user_id,
            bot,
            admin,
        }
    }

    #[test]
    fn test_parse_course_code() {
        let code = CourseCode::parse(" csse1001 ").unwrap();
        assert_eq!(code.to_string(), "CSSE1001");
        assert_eq!(code.descriptor(), "CSSE");
        assert_eq!(code.channel_name(), "csse1001");
        assert_eq!(code.category_name(), "CSSE");

        for bad in ["CSSE100", "CSS1001", "CSSE10011", "1001CSSE", "", "CSSE 1001"] {
            assert!(
                matches!(CourseCode::parse(bad), Err(CourseError::InvalidCode(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_descriptor_of_channel_names() {
        assert_eq!(descriptor_of("csse1001", false).as_deref(), Some("CSSE"));
        assert_eq!(descriptor_of("CSSE", true).as_deref(), Some("CSSE"));
        assert_eq!(descriptor_of("general", false), None);
        assert_eq!(descriptor_of("VOICE CHAT", true), None);
    }

    #[test]
    fn test_parse_descriptors() {
        assert_eq!(
            parse_descriptors("CSSE, COMP,CSSE").unwrap(),
            vec!["CSSE", "COMP"]
        );
        for bad in ["csse", "CSSE,", "CSSEE", "CS1E"] {
            assert!(
                matches!(parse_descriptors(bad), Err(CourseError::InvalidDescriptors(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_config_update() {
        let current = CourseConfig::defaults(9);
        assert!(current.auto_delete);
        assert!(!current.auto_delete_ignore_admins);

        let next = current
            .apply(&CourseConfigUpdate {
                auto_delete: Some(false),
                auto_delete_ignore_admins: None,
                codes: Some("MATH,STAT".to_string()),
            })
            .unwrap();
        assert!(!next.auto_delete);
        assert_eq!(next.descriptors, vec!["MATH", "STAT"]);

        // blank codes leave the list alone
        let same = next
            .apply(&CourseConfigUpdate {
                codes: Some("  ".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(same.descriptors, next.descriptors);

        assert!(next
            .apply(&CourseConfigUpdate {
                codes: Some("math".to_string()),
                ..Default::default()
            })
            .is_err());
    }

    #[test]
    fn test_check_allowed() {
        let config = config(&["CSSE"]);
        assert!(config
            .check_allowed(&CourseCode::parse("CSSE2310").unwrap())
            .is_ok());
        let err = config
            .check_allowed(&CourseCode::parse("MATH1051").unwrap())
            .unwrap_err();
        assert!(matches!(err, CourseError::DescriptorNotAllowed { ref descriptor, .. } if descriptor == "MATH"));
    }

    #[test]
    fn test_auto_delete_rules() {
        let mut config = config(&["CSSE"]);
        assert!(should_auto_delete(&config, &[]));
        assert!(should_auto_delete(&config, &[member(1, true, false)]));
        assert!(!should_auto_delete(&config, &[member(2, false, true)]));
        assert!(!should_auto_delete(&config, &[member(3, false, false)]));

        config.auto_delete_ignore_admins = true;
        assert!(should_auto_delete(&config, &[member(2, false, true)]));
        assert!(!should_auto_delete(&config, &[member(3, false, false)]));

        config.auto_delete = false;
        assert!(!should_auto_delete(&config, &[]));
    }

    #[test]
    fn test_enrolled_members_skip_bots_and_admins() {
        let members = [
            member(1, false, false),
            member(2, true, false),
            member(3, false, true),
        ];
        assert_eq!(enrolled_members(&members), vec![1]);
    }

    #[test]
    fn test_positions_are_alphabetical() {
        let config = config(&["COMP", "CSSE", "MATH"]);
        let mut channels = vec![
            category(1, "Welcome"),
            category(2, "COMP"),
            category(3, "MATH"),
        ];

        // after the one non-course category and COMP
        assert_eq!(category_position(&channels, &config, "CSSE"), 2);
        assert_eq!(category_position(&channels, &config, "STAT"), 3);

        channels.extend([
            category(4, "CSSE"),
            text(10, "csse1001", Some(4)),
            text(11, "csse2310", Some(4)),
        ]);

        assert_eq!(channel_position(&channels, 4, "csse1000"), 0);
        assert_eq!(channel_position(&channels, 4, "csse2002"), 1);
        assert_eq!(channel_position(&channels, 4, "csse3100"), 2);
        assert_eq!(channel_position(&channels, 2, "comp3506"), 0);
    }

    #[test]
    fn test_course_text_channels() {
        let config = config(&["CSSE"]);
        let channels = vec![
            category(1, "CSSE"),
            category(2, "General"),
            text(10, "csse1001", Some(1)),
            text(11, "chat", Some(2)),
            text(12, "csse2002", None),
        ];
        let ids: Vec<u64> = course_text_channels(&channels, &config)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![10]);
    }

    #[test]
    fn test_plan_sync() {
        let stored = vec![
            CourseChannelRow::new(1, &text(10, "csse1001", Some(1))),
            CourseChannelRow::new(1, &text(11, "csse2002", Some(1))),
            CourseChannelRow::new(1, &category(1, "CSSE")),
        ];
        let enrollments = HashMap::from([(10, vec![100, 101])]);
        let live = vec![
            LiveCourseChannel {
                channel: category(1, "CSSE"),
                members: Vec::new(),
            },
            LiveCourseChannel {
                channel: text(10, "csse1001-old", Some(1)),
                members: vec![101, 102],
            },
            LiveCourseChannel {
                channel: text(12, "csse3100", Some(1)),
                members: vec![200],
            },
        ];

        let plan = plan_sync(1, &stored, &enrollments, &live);
        assert_eq!(plan.removed_channels, vec![11]);
        assert_eq!(plan.renamed_channels, vec![(10, "csse1001-old".to_string())]);
        assert_eq!(plan.removed_enrollments, vec![(10, 100)]);
        assert_eq!(plan.added_enrollments, vec![(10, 102), (12, 200)]);
        assert_eq!(plan.added_channels.len(), 1);
        assert_eq!(plan.added_channels[0].channel_id, 12);
        assert!(!plan.added_channels[0].do_not_reset);
    }

    #[test]
    fn test_plan_sync_in_step_is_empty() {
        let stored = vec![CourseChannelRow::new(1, &text(10, "csse1001", Some(1)))];
        let enrollments = HashMap::from([(10, vec![100])]);
        let live = vec![LiveCourseChannel {
            channel: text(10, "csse1001", Some(1)),
            members: vec![100],
        }];
        assert!(plan_sync(1, &stored, &enrollments, &live).is_empty());
    }
}
