use serde::{Deserialize, Serialize};

use conwatch_core::{Settings, WatchEntryDraft};

/// Cross-context actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Page → background: upsert a draft.
    SaveVideo { data: WatchEntryDraft },
    /// Background → page: report the current video state.
    GetVideoDetails,
    /// UI → background: bookmark the active tab without a video.
    TriggerManualAdd,
    /// Page → background: read settings for the autosave policy.
    GetSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Ack { success: bool },
    Settings { settings: Settings },
    Details { data: Option<WatchEntryDraft> },
}

impl Response {
    pub fn ok() -> Self {
        Self::Ack { success: true }
    }

    pub fn failed() -> Self {
        Self::Ack { success: false }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ack { success: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(Message::GetVideoDetails).unwrap();
        assert_eq!(json, serde_json::json!({ "action": "GET_VIDEO_DETAILS" }));

        let json = serde_json::to_value(Message::TriggerManualAdd).unwrap();
        assert_eq!(json["action"], "TRIGGER_MANUAL_ADD");

        let msg: Message = serde_json::from_str(
            r#"{"action":"SAVE_VIDEO","data":{"id":"a.com/v","url":"https://a.com/v",
                "hostname":"a.com","title":"V","timestamp":3.5,"lastWatched":9}}"#,
        )
        .unwrap();
        let Message::SaveVideo { data } = msg else {
            panic!("expected SaveVideo");
        };
        assert_eq!(data.timestamp, 3.5);
        assert_eq!(data.duration, 0.0);
    }

    #[test]
    fn test_response_shapes() {
        assert_eq!(
            serde_json::to_value(Response::ok()).unwrap(),
            serde_json::json!({ "success": true })
        );
        assert_eq!(
            serde_json::to_value(Response::Details { data: None }).unwrap(),
            serde_json::json!({ "data": null })
        );
        let parsed: Response = serde_json::from_str(r#"{"data":null}"#).unwrap();
        assert_eq!(parsed, Response::Details { data: None });
    }
}
