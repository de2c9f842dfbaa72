//! ActionCable JSON wire format (`actioncable-v1-json`).

use courier_core::{CourierResult, ChannelIdentifier};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SUBPROTOCOL: &str = "actioncable-v1-json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Serialize)]
pub struct CableCommand {
    pub command: CommandKind,
    pub identifier: String,
}

impl CableCommand {
    pub fn subscribe(identifier: &ChannelIdentifier) -> Self {
        Self {
            command: CommandKind::Subscribe,
            identifier: identifier.to_wire(),
        }
    }

    pub fn unsubscribe(wire_identifier: &str) -> Self {
        Self {
            command: CommandKind::Unsubscribe,
            identifier: wire_identifier.to_string(),
        }
    }

    pub fn to_text(&self) -> CourierResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type", default)]
    frame_type: Option<String>,
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    reconnect: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    Welcome,
    Ping,
    Confirm { identifier: String },
    Reject { identifier: String },
    Disconnect { reason: Option<String>, reconnect: bool },
    Data { identifier: String, message: Value },
    Unknown(String),
}

pub fn parse_frame(text: &str) -> CourierResult<ServerFrame> {
    let raw: RawFrame = serde_json::from_str(text)?;

    let frame = match raw.frame_type.as_deref() {
        Some("welcome") => ServerFrame::Welcome,
        Some("ping") => ServerFrame::Ping,
        Some("confirm_subscription") => ServerFrame::Confirm {
            identifier: raw.identifier.unwrap_or_default(),
        },
        Some("reject_subscription") => ServerFrame::Reject {
            identifier: raw.identifier.unwrap_or_default(),
        },
        Some("disconnect") => ServerFrame::Disconnect {
            reason: raw.reason,
            reconnect: raw.reconnect.unwrap_or(false),
        },
        Some(other) => ServerFrame::Unknown(other.to_string()),
        None => match (raw.identifier, raw.message) {
            (Some(identifier), Some(message)) => ServerFrame::Data { identifier, message },
            _ => ServerFrame::Unknown(text.to_string()),
        },
    };

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::NOTIFICATIONS_CHANNEL;

    #[test]
    fn subscribe_command_nests_identifier_as_string() {
        let id = ChannelIdentifier::new(NOTIFICATIONS_CHANNEL);
        let text = CableCommand::subscribe(&id).to_text().unwrap();
        assert_eq!(
            text,
            r#"{"command":"subscribe","identifier":"{\"channel\":\"NotificationsChannel\"}"}"#
        );
    }

    #[test]
    fn parses_control_frames() {
        assert_eq!(parse_frame(r#"{"type":"welcome"}"#).unwrap(), ServerFrame::Welcome);
        assert_eq!(
            parse_frame(r#"{"type":"ping","message":1760688000}"#).unwrap(),
            ServerFrame::Ping
        );
        assert_eq!(
            parse_frame(r#"{"type":"disconnect","reason":"unauthorized","reconnect":false}"#).unwrap(),
            ServerFrame::Disconnect {
                reason: Some("unauthorized".to_string()),
                reconnect: false
            }
        );
    }

    #[test]
    fn parses_data_frames() {
        let frame = parse_frame(
            r#"{"identifier":"{\"channel\":\"NotificationsChannel\"}","message":{"notification":{"id":1}}}"#,
        )
        .unwrap();
        match frame {
            ServerFrame::Data { identifier, message } => {
                assert_eq!(identifier, r#"{"channel":"NotificationsChannel"}"#);
                assert_eq!(message["notification"]["id"], 1);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_frame("hello").is_err());
    }
}
