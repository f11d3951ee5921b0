// src/server/message.rs

use serde::{Deserialize, Serialize};

use crate::types::NotifyKind;

/// Message pushed to browser clients over the reload channel.
///
/// Serialised as `{"type":"reload"}` / `{"type":"inject"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    Reload,
    Inject,
}

impl ReloadMessage {
    pub fn to_json(self) -> String {
        match serde_json::to_string(&self) {
            Ok(json) => json,
            // Unit variants of an internally tagged enum always serialise.
            Err(_) => String::from(r#"{"type":"reload"}"#),
        }
    }
}

impl From<NotifyKind> for ReloadMessage {
    fn from(kind: NotifyKind) -> Self {
        match kind {
            NotifyKind::Reload => ReloadMessage::Reload,
            NotifyKind::Inject => ReloadMessage::Inject,
        }
    }
}
