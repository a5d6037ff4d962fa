//! # Course Catalogue Lookup
//!
//! Confirms that a well-formed course code names a real course.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! The catalogue page for an unknown code still answers 200, but carries a
//! `#course-notfound` element. Answers are cached per code so repeated
//! enrolments do not hammer the site.

use crate::features::courses::model::CourseCode;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use log::{debug, warn};
use scraper::{Html, Selector};
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 15;
/// The catalogue rejects requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";
const NOT_FOUND_SELECTOR: &str = "#course-notfound";

/// Decides whether a course code exists
#[async_trait]
pub trait CourseVerifier: Send + Sync {
    async fn verify(&self, code: &CourseCode) -> Result<bool>;
}

/// Accepts every well-formed code
pub struct FormatOnly;

#[async_trait]
impl CourseVerifier for FormatOnly {
    async fn verify(&self, _code: &CourseCode) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedAnswer {
    exists: bool,
    checked_at: DateTime<Utc>,
}

/// Looks codes up on the course catalogue website
pub struct CatalogueVerifier {
    client: reqwest::Client,
    base_url: String,
    ttl: ChronoDuration,
    cache: DashMap<String, CachedAnswer>,
}

impl CatalogueVerifier {
    /// `base_url` gets the upper-case code appended
    pub fn new(base_url: impl Into<String>, cache_days: i64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            ttl: ChronoDuration::days(cache_days),
            cache: DashMap::new(),
        })
    }

    fn cached(&self, code: &str, now: DateTime<Utc>) -> Option<bool> {
        self.cache
            .get(code)
            .filter(|answer| now - answer.checked_at < self.ttl)
            .map(|answer| answer.exists)
    }

    fn remember(&self, code: String, exists: bool, now: DateTime<Utc>) {
        self.cache.insert(
            code,
            CachedAnswer {
                exists,
                checked_at: now,
            },
        );
    }
}

#[async_trait]
impl CourseVerifier for CatalogueVerifier {
    async fn verify(&self, code: &CourseCode) -> Result<bool> {
        let key = code.to_string();
        let now = Utc::now();
        if let Some(exists) = self.cached(&key, now) {
            debug!("Course {key} answered from cache ({exists})");
            return Ok(exists);
        }

        let url = format!("{}{}", self.base_url, key);
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow!("Course catalogue timed out after {REQUEST_TIMEOUT_SECS} seconds")
            } else {
                anyhow!("Course catalogue request failed: {e}")
            }
        })?;

        // an error page says nothing about the course, so it is not cached
        let status = response.status();
        if !status.is_success() {
            warn!("⚠️ Course catalogue answered {status} for {key}");
            return Ok(false);
        }

        let exists = page_lists_course(&response.text().await?);
        self.remember(key, exists, now);
        Ok(exists)
    }
}

/// Whether a catalogue page describes a course rather than a not-found notice
pub fn page_lists_course(html: &str) -> bool {
    let document = Html::parse_document(html);
    match Selector::parse(NOT_FOUND_SELECTOR) {
        Ok(selector) => document.select(&selector).next().is_none(),
        Err(_) => false,
    }
}
