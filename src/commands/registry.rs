//! Slash command dispatch table
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use log::warn;
use std::collections::HashMap;
use std::sync::Arc;

use super::handler::SlashCommandHandler;

/// Lookup from a slash command name to the handler that owns it
///
/// One handler usually owns a family of commands (`/remind`, `/reminders`,
/// `/all_reminders`), so several names share a single `Arc`.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    by_name: HashMap<&'static str, Arc<dyn SlashCommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route every name the handler declares to it
    ///
    /// A name claimed twice goes to the newer handler.
    pub fn register(&mut self, handler: Arc<dyn SlashCommandHandler>) {
        for &name in handler.command_names() {
            if self.by_name.insert(name, Arc::clone(&handler)).is_some() {
                warn!("⚠️ /{name} was claimed by two handlers, keeping the newer one");
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SlashCommandHandler>> {
        self.by_name.get(name).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Routed command names (not distinct handlers)
    pub fn len(&self) -> usize {
        self.by_name.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::context::CommandContext;
    use anyhow::Result;
    use async_trait::async_trait;
    use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
    use serenity::prelude::Context;

    /// Claims a fixed set of names
    struct Named {
        names: &'static [&'static str],
    }

    #[async_trait]
    impl SlashCommandHandler for Named {
        fn command_names(&self) -> &'static [&'static str] {
            self.names
        }

        async fn handle(
            &self,
            _ctx: Arc<CommandContext>,
            _serenity_ctx: &Context,
            _command: &ApplicationCommandInteraction,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn names_behind(registry: &CommandRegistry, name: &str) -> Option<&'static [&'static str]> {
        registry.get(name).map(|handler| handler.command_names())
    }

    #[test]
    fn test_family_of_names_shares_one_handler() {
        let mut registry = CommandRegistry::default();
        assert_eq!(registry.len(), 0);

        let family: Arc<dyn SlashCommandHandler> = Arc::new(Named {
            names: &["remind", "reminders", "all_reminders"],
        });
        registry.register(Arc::clone(&family));

        assert_eq!(registry.len(), 3);
        for name in ["remind", "reminders", "all_reminders"] {
            assert!(Arc::ptr_eq(&registry.get(name).unwrap(), &family), "{name}");
        }
        assert!(!registry.contains("remindme"));
        assert!(registry.get("stats").is_none());
    }

    #[test]
    fn test_reclaimed_name_routes_to_newer_handler() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(Named { names: &["stats"] }));
        registry.register(Arc::new(Named {
            names: &["stats", "didiscream"],
        }));

        assert_eq!(registry.len(), 2);
        assert_eq!(
            names_behind(&registry, "stats"),
            Some(&["stats", "didiscream"][..])
        );
        assert!(registry.contains("didiscream"));
    }
}
