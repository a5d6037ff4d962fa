//! # Slash Commands (/)
//!
//! Discord native slash command definitions and option helpers.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

mod courses;
mod remind;
mod setup;
mod streaks;

use anyhow::Result;
use log::info;
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::Command;
use serenity::model::application::interaction::application_command::CommandDataOption;
use serenity::model::id::GuildId;
use serenity::prelude::Context;

/// Creates all slash command definitions
pub fn create_slash_commands() -> Vec<CreateApplicationCommand> {
    let mut commands = Vec::new();

    // Reminder commands
    commands.extend(remind::create_commands());

    // Streak commands
    commands.extend(streaks::create_commands());

    // Course commands
    commands.extend(courses::create_commands());

    // Setup commands
    commands.extend(setup::create_commands());

    commands
}

/// Registers all slash commands globally
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    let slash_commands = create_slash_commands();
    let count = slash_commands.len();

    Command::set_global_application_commands(&ctx.http, |commands| {
        for command in slash_commands {
            commands.add_application_command(command);
        }
        commands
    })
    .await?;

    info!("Global slash commands registered successfully ({count} commands)");
    Ok(())
}

/// Registers all slash commands for a specific guild (faster for testing)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    let slash_commands = create_slash_commands();
    let count = slash_commands.len();

    guild_id
        .set_application_commands(&ctx.http, |commands| {
            for command in slash_commands {
                commands.add_application_command(command);
            }
            commands
        })
        .await?;

    info!("Guild slash commands registered for guild {guild_id} ({count} commands)");
    Ok(())
}

/// Name and options of the invoked subcommand
pub fn subcommand(options: &[CommandDataOption]) -> Option<(&str, &[CommandDataOption])> {
    options
        .first()
        .map(|opt| (opt.name.as_str(), opt.options.as_slice()))
}

/// Utility function to get string option from slash command
pub fn get_string_option(options: &[CommandDataOption], name: &str) -> Option<String> {
    options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_ref())
        .and_then(|val| val.as_str())
        .map(|s| s.to_string())
}

/// Snowflake options (channel, role, user) arrive as strings
fn get_snowflake_option(options: &[CommandDataOption], name: &str) -> Option<u64> {
    options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_ref())
        .and_then(|val| val.as_str())
        .and_then(|s| s.parse().ok())
}

/// Utility function to get channel option from slash command
pub fn get_channel_option(options: &[CommandDataOption], name: &str) -> Option<u64> {
    get_snowflake_option(options, name)
}

/// Utility function to get role option from slash command
pub fn get_role_option(options: &[CommandDataOption], name: &str) -> Option<u64> {
    get_snowflake_option(options, name)
}

/// Utility function to get user option from slash command
pub fn get_user_option(options: &[CommandDataOption], name: &str) -> Option<u64> {
    get_snowflake_option(options, name)
}

/// Utility function to get integer option from slash command
pub fn get_integer_option(options: &[CommandDataOption], name: &str) -> Option<i64> {
    options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_ref())
        .and_then(|val| val.as_i64())
}

/// Utility function to get boolean option from slash command
pub fn get_bool_option(options: &[CommandDataOption], name: &str) -> Option<bool> {
    options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_ref())
        .and_then(|val| val.as_bool())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn command_names() -> Vec<String> {
        create_slash_commands()
            .iter()
            .map(|cmd| cmd.0.get("name").unwrap().as_str().unwrap().to_string())
            .collect()
    }

    fn find_command(name: &str) -> CreateApplicationCommand {
        create_slash_commands()
            .into_iter()
            .find(|cmd| cmd.0.get("name").and_then(Value::as_str) == Some(name))
            .unwrap()
    }

    fn option_names(command: &CreateApplicationCommand) -> Vec<String> {
        command
            .0
            .get("options")
            .and_then(Value::as_array)
            .map(|options| {
                options
                    .iter()
                    .filter_map(|o| o.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_create_slash_commands() {
        let names = command_names();
        let expected_commands = vec![
            "remind",
            "reminders",
            "all_reminders",
            "stats",
            "didiscream",
            "leaderboard",
            "save_streak",
            "course",
            "enrollment",
            "setup_statistics",
            "setup_course",
        ];

        for expected in &expected_commands {
            assert!(
                names.contains(&expected.to_string()),
                "Missing command: {expected}"
            );
        }
        assert_eq!(names.len(), expected_commands.len());
    }

    #[test]
    fn test_remind_options() {
        let remind = find_command("remind");
        assert_eq!(option_names(&remind), vec!["time", "message", "repeat"]);
    }

    #[test]
    fn test_setup_statistics_is_admin_only() {
        let setup = find_command("setup_statistics");
        assert!(setup.0.get("default_member_permissions").is_some());
        assert_eq!(option_names(&setup).len(), 7);

        let remind = find_command("remind");
        assert!(remind.0.get("default_member_permissions").is_none());
    }

    #[test]
    fn test_all_reminders_is_guild_only() {
        let all = find_command("all_reminders");
        assert!(all.0.get("default_member_permissions").is_some());
        assert_eq!(all.0.get("dm_permission"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_course_subcommands() {
        let course = find_command("course");
        assert_eq!(
            option_names(&course),
            vec![
                "enrol",
                "drop",
                "show",
                "reset",
                "reset_exception",
                "delete",
                "reset_all",
                "sync",
                "clean"
            ]
        );
        assert_eq!(course.0.get("dm_permission"), Some(&Value::Bool(false)));
        // members enrol themselves, so only the admin subcommands check permissions
        assert!(course.0.get("default_member_permissions").is_none());

        let enrollment = find_command("enrollment");
        assert_eq!(option_names(&enrollment), vec!["list", "purge"]);
        assert!(enrollment.0.get("default_member_permissions").is_some());

        let setup = find_command("setup_course");
        assert_eq!(
            option_names(&setup),
            vec!["auto_delete", "auto_delete_ignore_admins", "codes"]
        );
    }

    #[test]
    fn test_subcommand_extraction() {
        let options: Vec<CommandDataOption> = serde_json::from_value(serde_json::json!([{
            "name": "enrol",
            "type": 1,
            "options": [{ "name": "course_code", "type": 3, "value": "CSSE1001" }]
        }]))
        .unwrap();

        let (name, sub_options) = subcommand(&options).unwrap();
        assert_eq!(name, "enrol");
        assert_eq!(
            get_string_option(sub_options, "course_code").as_deref(),
            Some("CSSE1001")
        );
        assert!(subcommand(&[]).is_none());
    }
}
