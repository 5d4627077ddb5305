//! Slash command registry
//!
//! Handlers are registered once at startup under a lower-cased name and are
//! read-only afterwards. The resolver looks them up by exact name or prefix.

pub mod builtin;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{CommandError, CommandResult, RegistryError, ResultKind};

/// A pluggable slash command
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Name without the leading slash
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn kind(&self) -> ResultKind;

    /// Produce results for the text after the command name
    ///
    /// Errors are converted into a single displayable result by the caller.
    async fn results(&self, args: &str) -> Result<Vec<CommandResult>, CommandError>;
}

/// Split a slash query into lower-cased command name and trimmed arguments
///
/// Returns `None` when the query does not start with `/`.
pub fn parse_command(query: &str) -> Option<(String, &str)> {
    let body = query.strip_prefix('/')?;
    let (name, args) = match body.split_once(' ') {
        Some((name, args)) => (name, args.trim()),
        None => (body, ""),
    };
    Some((name.to_lowercase(), args))
}

/// Registered commands in registration order
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<(String, Arc<dyn CommandHandler>)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) -> Result<(), RegistryError> {
        let name = handler.name().trim().to_lowercase();
        if name.is_empty() || name.starts_with('/') || name.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidName(handler.name().to_string()));
        }
        if self.get(&name).is_some() {
            return Err(RegistryError::Duplicate(name));
        }
        tracing::debug!(command = %name, "Registered command");
        self.commands.push((name, handler));
        Ok(())
    }

    /// Exact, case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<&Arc<dyn CommandHandler>> {
        let name = name.to_lowercase();
        self.commands
            .iter()
            .find(|(registered, _)| *registered == name)
            .map(|(_, handler)| handler)
    }

    /// Commands whose name starts with `prefix`, in registration order
    pub fn matching(&self, prefix: &str) -> Vec<&Arc<dyn CommandHandler>> {
        let prefix = prefix.to_lowercase();
        self.commands
            .iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .map(|(_, handler)| handler)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn CommandHandler>)> {
        self.commands
            .iter()
            .map(|(name, handler)| (name.as_str(), handler))
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Named(&'static str);

    #[async_trait]
    impl CommandHandler for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "test"
        }
        fn kind(&self) -> ResultKind {
            ResultKind::System
        }
        async fn results(&self, _args: &str) -> Result<Vec<CommandResult>, CommandError> {
            Ok(Vec::new())
        }
    }

    fn registry(names: &[&'static str]) -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        for name in names {
            registry.register(Arc::new(Named(name))).unwrap();
        }
        registry
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("/File  report q3 "), Some(("file".to_string(), "report q3")));
        assert_eq!(parse_command("/clear"), Some(("clear".to_string(), "")));
        assert_eq!(parse_command("/"), Some((String::new(), "")));
        assert_eq!(parse_command("clear"), None);
    }

    #[test]
    fn test_registration_lowercases_and_rejects_duplicates() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(Named("Clip"))).unwrap();
        assert_eq!(registry.names(), vec!["clip"]);
        assert_eq!(
            registry.register(Arc::new(Named("clip"))),
            Err(RegistryError::Duplicate("clip".to_string()))
        );
        assert!(matches!(
            registry.register(Arc::new(Named("two words"))),
            Err(RegistryError::InvalidName(_))
        ));
        assert!(matches!(
            registry.register(Arc::new(Named(""))),
            Err(RegistryError::InvalidName(_))
        ));
    }

    #[test]
    fn test_prefix_matching_keeps_registration_order() {
        let registry = registry(&["file", "folder", "clip", "find"]);
        let names: Vec<_> = registry.matching("f").iter().map(|h| h.name().to_string()).collect();
        assert_eq!(names, vec!["file", "folder", "find"]);
        assert!(registry.matching("z").is_empty());
        assert!(registry.get("FILE").is_some());
        assert!(registry.get("fil").is_none());
    }

    proptest! {
        #[test]
        fn prop_parse_name_has_no_space(name in "[a-zA-Z]{0,8}", args in "[ a-z0-9]{0,16}") {
            let query = format!("/{name} {args}");
            let (parsed, rest) = parse_command(&query).unwrap();
            prop_assert_eq!(parsed, name.to_lowercase());
            prop_assert_eq!(rest, args.trim());
        }
    }
}
