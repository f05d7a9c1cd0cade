//! Dialog requests and responses.
//!
//! The transport turns a [`DialogRequest`] into client markup and parses the
//! client's answer back into a [`DialogResponse`]. This module only cares
//! about the fields the command core reads: the dialog name, the confirmation
//! token and the button pressed.

use std::collections::HashMap;

use uuid::Uuid;

pub const BUTTON_CONFIRM: &str = "confirm";
pub const BUTTON_CANCEL: &str = "cancel";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogRequest {
    pub name: String,
    /// Set when the dialog is awaiting a confirmation round trip.
    pub token: Option<Uuid>,
    pub icon: u16,
    pub title: String,
    pub lines: Vec<String>,
    /// Empty when the dialog only has the confirm button.
    pub cancel_label: String,
    pub confirm_label: String,
}

impl DialogRequest {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            token: None,
            icon: 0,
            title: String::new(),
            lines: Vec::new(),
            cancel_label: String::new(),
            confirm_label: "OK".to_string(),
        }
    }

    pub fn label_with_icon(mut self, title: &str, icon: u16) -> Self {
        self.title = title.to_string();
        self.icon = icon;
        self
    }

    pub fn text(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn buttons(mut self, cancel: &str, confirm: &str) -> Self {
        self.cancel_label = cancel.to_string();
        self.confirm_label = confirm.to_string();
        self
    }

    pub fn with_token(mut self, token: Uuid) -> Self {
        self.token = Some(token);
        self
    }
}

/// A client's answer to a dialog. Any field may be missing on a malformed reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogResponse {
    pub dialog_name: Option<String>,
    pub token: Option<String>,
    pub button: Option<String>,
}

impl DialogResponse {
    pub fn new(dialog_name: &str, token: Uuid, button: &str) -> Self {
        Self {
            dialog_name: Some(dialog_name.to_string()),
            token: Some(token.to_string()),
            button: Some(button.to_string()),
        }
    }

    /// Build from the flat key/value fields a client posts back.
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let get = |k: &str| fields.get(k).filter(|v| !v.is_empty()).cloned();
        Self {
            dialog_name: get("dialog_name"),
            token: get("token"),
            button: get("buttonClicked"),
        }
    }

    /// Parse the `key|value` line format used by game clients for dialog returns.
    pub fn parse(text: &str) -> Self {
        let fields: HashMap<String, String> = text
            .lines()
            .filter_map(|line| line.split_once('|'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        Self::from_fields(&fields)
    }

    pub fn is_confirm(&self) -> bool {
        self.button.as_deref() == Some(BUTTON_CONFIRM)
    }
}
