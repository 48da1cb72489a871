//! Wire messages exchanged with the client.
//!
//! One JSON object per message. Outbound frame messages use explicit
//! absence for the distance: the `distance` field is omitted entirely when
//! no face was detected and `faceDetected` is always present, so absence is
//! unambiguous without a sentinel value.

use serde::{Deserialize, Serialize};

/// Server → client messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// Calibration progress / terminal status.
    Calibration {
        #[serde(rename = "calibrationStatus")]
        calibration_status: String,
        /// Percentage, 0–100.
        progress: u8,
    },
    /// One processed frame with its distance reading.
    Frame {
        /// Base64-encoded JPEG bytes of the annotated frame.
        image: String,
        /// Meters; omitted when no face was detected.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        distance: Option<f64>,
        #[serde(rename = "faceDetected")]
        face_detected: bool,
    },
    /// Per-message error report; the session continues afterwards.
    Error { error: String },
}

impl ServerMessage {
    pub fn calibration(status: impl Into<String>, progress: u8) -> Self {
        ServerMessage::Calibration {
            calibration_status: status.into(),
            progress,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        ServerMessage::Error { error: text.into() }
    }
}

/// Client → server message carrying one frame to process.
///
/// `{}` is a valid message with `image: None`; the server answers it with
/// an error and keeps the connection open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_message_wire_shape() {
        let msg = ServerMessage::Frame {
            image: "abcd".into(),
            distance: Some(0.81),
            face_detected: true,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["image"], "abcd");
        assert_eq!(json["distance"], 0.81);
        assert_eq!(json["faceDetected"], true);
    }

    #[test]
    fn test_frame_message_omits_absent_distance() {
        let msg = ServerMessage::Frame {
            image: "abcd".into(),
            distance: None,
            face_detected: false,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert!(json.get("distance").is_none());
        assert_eq!(json["faceDetected"], false);
    }

    #[test]
    fn test_calibration_message_wire_shape() {
        let msg = ServerMessage::calibration("Calibrating... 3/30", 10);
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["calibrationStatus"], "Calibrating... 3/30");
        assert_eq!(json["progress"], 10);
    }

    #[test]
    fn test_error_message_wire_shape() {
        let json: serde_json::Value =
            serde_json::to_value(ServerMessage::error("No image received")).unwrap();
        assert_eq!(json["error"], "No image received");
    }

    #[test]
    fn test_empty_object_parses_as_missing_image() {
        let msg: ClientMessage = serde_json::from_str("{}").unwrap();
        assert!(msg.image.is_none());
    }

    #[test]
    fn test_client_message_with_image() {
        let msg: ClientMessage = serde_json::from_str(r#"{"image":"aGVsbG8="}"#).unwrap();
        assert_eq!(msg.image.as_deref(), Some("aGVsbG8="));
    }

    #[test]
    fn test_server_message_round_trip() {
        let original = ServerMessage::Frame {
            image: "xyz".into(),
            distance: Some(1.5),
            face_detected: true,
        };
        let text = serde_json::to_string(&original).unwrap();
        let parsed: ServerMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, original);
    }
}
