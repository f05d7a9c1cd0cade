//! Role tiers and the permission check used by every command gate.
//!
//! Roles map to fixed ordinal levels. Higher values imply a superset of lower
//! capabilities, and any role name the table does not know maps to level 0.
//!
//! A command's permission set is a list of *minimum* roles: listing a lower
//! tier implicitly admits every higher tier as well. It is not an allow-list.
use serde::{Deserialize, Serialize};

/// Level constants
pub const LEVEL_NONE: u8 = 0;
pub const LEVEL_BASIC: u8 = 1;
pub const LEVEL_SUPPORTER: u8 = 2;
pub const LEVEL_DEVELOPER: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Basic,
    Supporter,
    Developer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Basic, Role::Supporter, Role::Developer];

    pub fn level(self) -> u8 {
        match self {
            Role::Basic => LEVEL_BASIC,
            Role::Supporter => LEVEL_SUPPORTER,
            Role::Developer => LEVEL_DEVELOPER,
        }
    }

    /// Wire identifier as stored on player records ("1", "2", "3" are accepted too).
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Basic => "BASIC",
            Role::Supporter => "SUPPORTER",
            Role::Developer => "DEVELOPER",
        }
    }

    pub fn parse(name: &str) -> Option<Role> {
        match name.trim().to_ascii_uppercase().as_str() {
            "BASIC" | "1" => Some(Role::Basic),
            "SUPPORTER" | "2" => Some(Role::Supporter),
            "DEVELOPER" | "3" => Some(Role::Developer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(role_name(self.level()))
    }
}

/// Level of a raw role identifier; unknown identifiers are level 0.
pub fn level_of(role: &str) -> u8 {
    Role::parse(role).map(Role::level).unwrap_or(LEVEL_NONE)
}

/// True iff some required role sits at or below the actor's level.
///
/// An empty permission set admits nobody.
pub fn is_authorized(actor_level: u8, required: &[Role]) -> bool {
    required.iter().any(|r| r.level() <= actor_level)
}

/// Return the human-readable role name for a numeric level.
pub fn role_name(level: u8) -> &'static str {
    match level {
        LEVEL_DEVELOPER => "Developer",
        LEVEL_SUPPORTER => "Supporter",
        LEVEL_BASIC => "Basic",
        _ => "Guest",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_roles_are_level_zero() {
        assert_eq!(level_of("BASIC"), 1);
        assert_eq!(level_of("developer"), 3);
        assert_eq!(level_of("MODERATOR"), 0);
        assert_eq!(level_of(""), 0);
    }

    #[test]
    fn permission_is_a_minimum_bar() {
        // exhaustive over every actor tier and every non-trivial permission set
        let sets: Vec<Vec<Role>> = vec![
            vec![Role::Basic],
            vec![Role::Supporter],
            vec![Role::Developer],
            vec![Role::Supporter, Role::Developer],
            vec![Role::Basic, Role::Supporter, Role::Developer],
        ];
        for level in [LEVEL_NONE, LEVEL_BASIC, LEVEL_SUPPORTER, LEVEL_DEVELOPER] {
            for set in &sets {
                let expected = set.iter().any(|r| r.level() <= level);
                assert_eq!(is_authorized(level, set), expected, "level {} set {:?}", level, set);
            }
        }
        assert!(is_authorized(LEVEL_DEVELOPER, &[Role::Basic]));
        assert!(!is_authorized(LEVEL_BASIC, &[Role::Developer]));
        assert!(!is_authorized(LEVEL_DEVELOPER, &[]));
    }

    #[test]
    fn role_names() {
        assert_eq!(Role::Supporter.to_string(), "Supporter");
        assert_eq!(role_name(0), "Guest");
        assert_eq!(Role::parse(" 3 "), Some(Role::Developer));
    }
}
