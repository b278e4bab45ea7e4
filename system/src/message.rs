use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type ConnectionId = u32;

/// Every frame is a JSON envelope `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    SubmitName(NameSubmission),
    /// Kept as raw JSON until it passes `validate_drawing`.
    Drawing(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameSubmission {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    NameAssigned(String),
    DrawingData(Value),
}

impl ClientMessage {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl ServerMessage {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_reads_name_submission() {
        let message = ClientMessage::from_json(r#"{"event":"submitName","data":{"name":"Alex"}}"#)
            .expect("");
        assert_eq!(
            message,
            ClientMessage::SubmitName(NameSubmission {
                name: "Alex".into()
            })
        );
    }

    #[test]
    fn it_treats_missing_name_as_empty() {
        let message =
            ClientMessage::from_json(r#"{"event":"submitName","data":{}}"#).expect("");
        assert_eq!(message, ClientMessage::SubmitName(NameSubmission::default()));
    }

    #[test]
    fn it_keeps_drawing_payload_untouched() {
        let message =
            ClientMessage::from_json(r#"{"event":"drawing","data":[1,2,3]}"#).expect("");
        assert_eq!(message, ClientMessage::Drawing(json!([1, 2, 3])));
    }

    #[test]
    fn it_rejects_unknown_events() {
        assert!(ClientMessage::from_json(r#"{"event":"clear","data":{}}"#).is_err());
        assert!(ClientMessage::from_json("not json").is_err());
    }

    #[test]
    fn it_writes_server_messages_in_envelope() {
        let text = ServerMessage::NameAssigned("User_1".into())
            .to_json()
            .expect("");
        assert_eq!(text, r#"{"event":"nameAssigned","data":"User_1"}"#);

        let text = ServerMessage::DrawingData(json!({ "x0": 100 }))
            .to_json()
            .expect("");
        assert_eq!(text, r#"{"event":"drawingData","data":{"x0":100}}"#);
    }
}
