//! Action commands — the inbound half of the Head/Body contract.
//!
//! The Head sends one JSON object per command:
//!
//! ```json
//! {"action": "flee", "reason": "hostile_nearby"}
//! ```
//!
//! Only `action` is interpreted. Every other field is kept verbatim in
//! [`ActionCommand::params`] so the schema can grow without breaking decoding.

use serde::{Deserialize, Serialize};

/// The action tag. Unrecognized tags are preserved in [`ActionKind::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    Flee,
    Eat,
    Idle,
    Explore,
    Unknown(String),
}

impl ActionKind {
    /// Parse a wire tag. Matching is exact (`"FLEE"` is unknown).
    pub fn parse(tag: &str) -> Self {
        match tag {
            "flee" => Self::Flee,
            "eat" => Self::Eat,
            "idle" => Self::Idle,
            "explore" => Self::Explore,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire tag for this action.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Flee => "flee",
            Self::Eat => "eat",
            Self::Idle => "idle",
            Self::Explore => "explore",
            Self::Unknown(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    fn missing() -> Self {
        Self::Unknown(String::new())
    }
}

impl From<String> for ActionKind {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single decoded command from the Head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCommand {
    /// Which behavior to run
    #[serde(default = "ActionKind::missing")]
    pub action: ActionKind,

    /// Any additional fields, untouched
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl ActionCommand {
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            params: serde_json::Map::new(),
        }
    }

    /// Attach an extra field.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Decode one inbound message.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Encode for the wire.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The free-form `reason` the Head attaches, if any.
    pub fn reason(&self) -> Option<&str> {
        self.params.get("reason").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_actions() {
        for (text, kind) in [
            (r#"{"action":"flee"}"#, ActionKind::Flee),
            (r#"{"action":"eat"}"#, ActionKind::Eat),
            (r#"{"action":"idle"}"#, ActionKind::Idle),
            (r#"{"action":"explore"}"#, ActionKind::Explore),
        ] {
            let cmd = ActionCommand::decode(text).unwrap();
            assert_eq!(cmd.action, kind);
            assert!(cmd.action.is_known());
        }
    }

    #[test]
    fn unknown_tag_is_preserved() {
        let cmd = ActionCommand::decode(r#"{"action":"dance"}"#).unwrap();
        assert_eq!(cmd.action, ActionKind::Unknown("dance".into()));
        assert_eq!(cmd.action.to_string(), "dance");
    }

    #[test]
    fn tags_are_case_sensitive() {
        let cmd = ActionCommand::decode(r#"{"action":"FLEE"}"#).unwrap();
        assert!(!cmd.action.is_known());
    }

    #[test]
    fn missing_action_decodes_as_unknown() {
        let cmd = ActionCommand::decode(r#"{"reason":"no_threat"}"#).unwrap();
        assert_eq!(cmd.action, ActionKind::Unknown(String::new()));
        assert_eq!(cmd.reason(), Some("no_threat"));
    }

    #[test]
    fn extra_fields_are_tolerated() {
        let cmd = ActionCommand::decode(
            r#"{"action":"flee","reason":"critical_health","urgency":3,"target":{"x":1}}"#,
        )
        .unwrap();
        assert_eq!(cmd.action, ActionKind::Flee);
        assert_eq!(cmd.reason(), Some("critical_health"));
        assert_eq!(cmd.params["urgency"], 3);
        assert!(cmd.params["target"].is_object());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(ActionCommand::decode("{not json").is_err());
        assert!(ActionCommand::decode(r#"{"action":5}"#).is_err());
    }

    #[test]
    fn encode_keeps_params_at_top_level() {
        let cmd = ActionCommand::new(ActionKind::Eat).with_param("reason", "hungry");
        let json: serde_json::Value = serde_json::from_str(&cmd.encode().unwrap()).unwrap();
        assert_eq!(json["action"], "eat");
        assert_eq!(json["reason"], "hungry");
    }
}
