use crate::error::TileGateError;
use crate::roles::{is_authorized, Role};

/// Longest cooldown a command may declare (one day).
pub const MAX_COOLDOWN_SECS: u64 = 86_400;

/// Static metadata attached to every command.
///
/// Built once per command through [`CommandDescriptor::builder`] and never
/// changed afterwards. The first alias is the canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    aliases: Vec<String>,
    description: String,
    cooldown_secs: u64,
    rate_limit: u32,
    category: String,
    usage: String,
    examples: Vec<String>,
    permission: Vec<Role>,
}

impl CommandDescriptor {
    pub fn builder(aliases: &[&str]) -> DescriptorBuilder {
        DescriptorBuilder {
            inner: CommandDescriptor {
                aliases: aliases.iter().map(|a| a.trim().to_ascii_lowercase()).collect(),
                description: String::new(),
                cooldown_secs: 0,
                rate_limit: 1,
                category: String::new(),
                usage: String::new(),
                examples: Vec::new(),
                permission: Vec::new(),
            },
        }
    }

    /// Canonical alias.
    pub fn name(&self) -> &str {
        &self.aliases[0]
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn cooldown_secs(&self) -> u64 {
        self.cooldown_secs
    }

    /// Invocations allowed per cooldown window.
    pub fn rate_limit(&self) -> u32 {
        self.rate_limit
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    pub fn permission(&self) -> &[Role] {
        &self.permission
    }

    /// An empty permission set marks an ungated command.
    pub fn is_gated(&self) -> bool {
        !self.permission.is_empty()
    }

    pub fn allows(&self, level: u8) -> bool {
        !self.is_gated() || is_authorized(level, &self.permission)
    }

    /// Lowest role the permission set admits.
    pub fn minimum_role(&self) -> Option<Role> {
        self.permission.iter().copied().min_by_key(|r| r.level())
    }
}

pub struct DescriptorBuilder {
    inner: CommandDescriptor,
}

impl DescriptorBuilder {
    pub fn description(mut self, text: &str) -> Self {
        self.inner.description = text.to_string();
        self
    }

    pub fn cooldown(mut self, secs: u64) -> Self {
        self.inner.cooldown_secs = secs;
        self
    }

    pub fn rate_limit(mut self, max: u32) -> Self {
        self.inner.rate_limit = max;
        self
    }

    pub fn category(mut self, label: &str) -> Self {
        self.inner.category = label.to_string();
        self
    }

    pub fn usage(mut self, text: &str) -> Self {
        self.inner.usage = text.to_string();
        self
    }

    pub fn example(mut self, text: &str) -> Self {
        self.inner.examples.push(text.to_string());
        self
    }

    pub fn permission(mut self, roles: &[Role]) -> Self {
        self.inner.permission = roles.to_vec();
        self
    }

    pub fn build(self) -> Result<CommandDescriptor, TileGateError> {
        let d = self.inner;
        if d.aliases.is_empty() {
            return Err(TileGateError::InvalidDescriptor("command has no aliases".into()));
        }
        if let Some(bad) = d
            .aliases
            .iter()
            .find(|a| a.is_empty() || a.chars().any(char::is_whitespace))
        {
            return Err(TileGateError::InvalidDescriptor(format!(
                "alias '{}' of /{} is empty or contains whitespace",
                bad, d.aliases[0]
            )));
        }
        if d.rate_limit == 0 {
            return Err(TileGateError::InvalidDescriptor(format!(
                "/{} must allow at least one invocation per window",
                d.aliases[0]
            )));
        }
        if d.cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(TileGateError::InvalidDescriptor(format!(
                "/{} cooldown of {}s exceeds {}s",
                d.aliases[0], d.cooldown_secs, MAX_COOLDOWN_SECS
            )));
        }
        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_normalized() {
        let d = CommandDescriptor::builder(&["ClearWorld", " CW "])
            .permission(&[Role::Developer])
            .build()
            .unwrap();
        assert_eq!(d.name(), "clearworld");
        assert_eq!(d.aliases(), &["clearworld".to_string(), "cw".to_string()]);
    }

    #[test]
    fn invalid_descriptors_are_rejected() {
        assert!(CommandDescriptor::builder(&[]).build().is_err());
        assert!(CommandDescriptor::builder(&["two words"]).build().is_err());
        assert!(CommandDescriptor::builder(&["x"]).rate_limit(0).build().is_err());
        assert!(CommandDescriptor::builder(&["x"])
            .cooldown(MAX_COOLDOWN_SECS + 1)
            .build()
            .is_err());
        assert!(CommandDescriptor::builder(&["x"])
            .cooldown(u64::MAX)
            .build()
            .is_err());
        assert!(CommandDescriptor::builder(&["x"])
            .cooldown(MAX_COOLDOWN_SECS)
            .build()
            .is_ok());
    }

    #[test]
    fn gating_uses_minimum_role() {
        let d = CommandDescriptor::builder(&["kick"])
            .permission(&[Role::Developer, Role::Supporter])
            .build()
            .unwrap();
        assert_eq!(d.minimum_role(), Some(Role::Supporter));
        assert!(d.allows(Role::Supporter.level()));
        assert!(d.allows(Role::Developer.level()));
        assert!(!d.allows(Role::Basic.level()));

        let open = CommandDescriptor::builder(&["ping"]).build().unwrap();
        assert!(!open.is_gated());
        assert!(open.allows(0));
    }
}
