//! Input validation for command lines, world names and dialog tokens.

/// Rejections produced while validating client input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Input is empty")]
    Empty,

    #[error("Input too long (max {max} characters)")]
    TooLong { max: usize },

    #[error("Invalid world name: {reason}")]
    InvalidWorldName { reason: String },

    #[error("Invalid confirmation token")]
    InvalidToken,
}

/// Longest world name the server accepts.
pub const MAX_WORLD_NAME: usize = 24;

/// Clean up a raw command line: trim, drop control characters, cap length.
pub fn sanitize_command_line(raw: &str, max_chars: usize) -> Result<String, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }
    if trimmed.chars().count() > max_chars {
        return Err(InputError::TooLong { max: max_chars });
    }
    Ok(trimmed.chars().filter(|c| !c.is_control()).collect())
}

/// World names are case-insensitive and stored upper-case.
///
/// Only ASCII letters and digits are allowed so the name can be used directly
/// in storage keys.
pub fn normalize_world_name(name: &str) -> Result<String, InputError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(InputError::InvalidWorldName {
            reason: "World name cannot be empty".to_string(),
        });
    }
    if trimmed.len() > MAX_WORLD_NAME {
        return Err(InputError::InvalidWorldName {
            reason: format!("World name too long (max {} characters)", MAX_WORLD_NAME),
        });
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(InputError::InvalidWorldName {
            reason: "World name must contain only letters and numbers".to_string(),
        });
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Parse a confirmation token echoed back by the client.
pub fn parse_token(raw: &str) -> Result<uuid::Uuid, InputError> {
    uuid::Uuid::parse_str(raw.trim()).map_err(|_| InputError::InvalidToken)
}
