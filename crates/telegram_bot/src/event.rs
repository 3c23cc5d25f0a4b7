//! Transport independent input and output of the conversation engine.

use serde::{Deserialize, Serialize};

/// Something a user did in a group chat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub group_id: i64,
    /// Username of the sender.
    pub user: String,
    pub kind: EventKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// `/name args`, with the `@bot` suffix already stripped.
    Command { name: String, args: String },
    /// Plain text.
    Text(String),
    /// Inline button press, carrying the button tag.
    Callback(String),
}

impl Event {
    pub fn command(group_id: i64, user: &str, name: &str, args: &str) -> Self {
        Self {
            group_id,
            user: user.to_string(),
            kind: EventKind::Command {
                name: name.to_string(),
                args: args.trim().to_string(),
            },
        }
    }

    pub fn text(group_id: i64, user: &str, body: &str) -> Self {
        Self {
            group_id,
            user: user.to_string(),
            kind: EventKind::Text(body.to_string()),
        }
    }

    pub fn callback(group_id: i64, user: &str, tag: &str) -> Self {
        Self {
            group_id,
            user: user.to_string(),
            kind: EventKind::Callback(tag.to_string()),
        }
    }
}

/// An inline button. Pressing it produces [`EventKind::Callback`] with `tag`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub tag: String,
}

impl Button {
    pub fn new(label: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tag: tag.into(),
        }
    }
}

/// A file sent along with a reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Message to send back to the group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub group_id: i64,
    pub text: String,
    /// Rows of inline buttons.
    pub buttons: Option<Vec<Vec<Button>>>,
    pub attachment: Option<Attachment>,
}

impl Reply {
    pub fn text(group_id: i64, text: impl Into<String>) -> Self {
        Self {
            group_id,
            text: text.into(),
            buttons: None,
            attachment: None,
        }
    }

    #[must_use]
    pub fn with_buttons(mut self, buttons: Vec<Vec<Button>>) -> Self {
        if !buttons.is_empty() {
            self.buttons = Some(buttons);
        }
        self
    }

    #[must_use]
    pub fn with_attachment(mut self, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.attachment = Some(Attachment {
            file_name: file_name.into(),
            bytes,
        });
        self
    }
}
