//! Foreground → agent messages.
//!
//! Delivery is fire-and-forget: there is no acknowledgement, and a message
//! posted while no agent is running is lost.

use serde::{Deserialize, Serialize};

use super::config::NotificationConfigPatch;

/// Message posted to the agent.
///
/// Wire form: `{ "type": "CONFIG_UPDATE", "config": { ... } }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentMessage {
    /// Merge the carried fields into the agent's notification config.
    #[serde(rename = "CONFIG_UPDATE")]
    ConfigUpdate {
        /// Fields to override.
        #[serde(default)]
        config: NotificationConfigPatch,
    },
    /// Any other message type; the agent ignores it.
    #[serde(other)]
    Unknown,
}

impl AgentMessage {
    /// Build a config update message.
    pub fn config_update(config: NotificationConfigPatch) -> Self {
        Self::ConfigUpdate { config }
    }

    /// Parse an arbitrary JSON message, treating anything unrecognised as
    /// [`AgentMessage::Unknown`].
    pub fn from_value(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or(Self::Unknown)
    }
}
