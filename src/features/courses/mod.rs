//! # Courses Feature
//!
//! Private per-course chats members join and leave with `/course`, plus the
//! admin tools that keep them tidy.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: true

pub mod guild;
pub mod model;
pub mod service;
pub mod verifier;

pub use guild::{GuildChannels, SerenityGuild};
pub use model::{CourseCode, CourseConfig, CourseConfigUpdate};
pub use service::{CourseService, CourseSummary, DropOutcome, ResetReport, SyncReport};
pub use verifier::{CatalogueVerifier, CourseVerifier, FormatOnly};
