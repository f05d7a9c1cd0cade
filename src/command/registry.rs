use std::collections::HashMap;
use std::sync::Arc;

use super::Command;
use crate::error::TileGateError;

/// Alias table built once at startup and handed to the dispatcher.
#[derive(Default)]
pub struct CommandRegistry {
    by_alias: HashMap<String, Arc<dyn Command>>,
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every alias of `command`. Nothing is registered if any alias
    /// is already taken.
    pub fn register(&mut self, command: Arc<dyn Command>) -> Result<(), TileGateError> {
        let descriptor = command.descriptor();
        for alias in descriptor.aliases() {
            if let Some(owner) = self.by_alias.get(alias) {
                return Err(TileGateError::DuplicateAlias {
                    alias: alias.clone(),
                    owner: owner.descriptor().name().to_string(),
                });
            }
        }
        for alias in descriptor.aliases() {
            self.by_alias.insert(alias.clone(), Arc::clone(&command));
        }
        self.commands.push(command);
        Ok(())
    }

    pub fn with(mut self, command: Arc<dyn Command>) -> Result<Self, TileGateError> {
        self.register(command)?;
        Ok(self)
    }

    /// Case-insensitive alias lookup.
    pub fn lookup(&self, alias: &str) -> Option<Arc<dyn Command>> {
        self.by_alias.get(&alias.to_ascii_lowercase()).cloned()
    }

    /// Each registered command once, in registration order.
    pub fn commands(&self) -> &[Arc<dyn Command>] {
        &self.commands
    }

    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.by_alias.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
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
    use crate::command::{CommandContext, CommandDescriptor};
    use crate::roles::Role;
    use crate::BoxFuture;

    struct Stub(CommandDescriptor);

    impl Command for Stub {
        fn descriptor(&self) -> &CommandDescriptor {
            &self.0
        }

        fn execute<'a>(&'a self, _ctx: CommandContext<'a>) -> BoxFuture<'a, Result<(), TileGateError>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn stub(aliases: &[&str]) -> Arc<dyn Command> {
        Arc::new(Stub(
            CommandDescriptor::builder(aliases)
                .permission(&[Role::Basic])
                .build()
                .unwrap(),
        ))
    }

    #[test]
    fn every_alias_resolves_to_one_command() {
        let reg = CommandRegistry::new()
            .with(stub(&["help", "?"]))
            .unwrap()
            .with(stub(&["clearworld", "cw"]))
            .unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.aliases(), vec!["?", "clearworld", "cw", "help"]);
        let a = reg.lookup("CW").unwrap();
        let b = reg.lookup("clearworld").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(reg.lookup("nope").is_none());
    }

    #[test]
    fn duplicate_alias_registers_nothing() {
        let mut reg = CommandRegistry::new().with(stub(&["help", "?"])).unwrap();
        let err = reg.register(stub(&["halp", "?"])).unwrap_err();
        assert!(matches!(err, TileGateError::DuplicateAlias { ref owner, .. } if owner == "help"));
        assert!(reg.lookup("halp").is_none());
        assert_eq!(reg.len(), 1);
    }
}
