use serde::{Deserialize, Serialize};
use std::fmt;

/// The `type` tag of a stream record.
///
/// Unrecognized tags are kept verbatim so they can still be logged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Searching,
    Found,
    NotFound,
    Success,
    Error,
    Unknown(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Searching => "searching",
            Self::Found => "found",
            Self::NotFound => "not_found",
            Self::Success => "success",
            Self::Error => "error",
            Self::Unknown(kind) => kind.as_str(),
        }
    }

    /// `success` and `error` end a conversion run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

impl From<String> for EventKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "searching" => Self::Searching,
            "found" => Self::Found,
            "not_found" => Self::NotFound,
            "success" => Self::Success,
            "error" => Self::Error,
            _ => Self::Unknown(kind),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> String {
        match kind {
            EventKind::Unknown(kind) => kind,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary statistics sent along with a `success` record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stats {
    pub total_videos: u64,
    pub found_tracks: u64,
    pub not_found: u64,
}

/// One decoded record of the conversion stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
}

impl StreamEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            message: None,
            current: None,
            total: None,
            track: None,
            playlist_id: None,
            stats: None,
        }
    }

    /// The server supplied message, or a description built from the
    /// record's fields when the message is missing.
    pub fn describe(&self) -> String {
        if let Some(message) = &self.message {
            return message.to_owned();
        }
        match (&self.kind, &self.track) {
            (EventKind::Searching, Some(track)) => format!("Searching for track: {}", track),
            (EventKind::Searching, None) => "Searching".to_string(),
            (EventKind::Found, Some(track)) => format!("Found track: {}", track),
            (EventKind::Found, None) => "Found track".to_string(),
            (EventKind::NotFound, Some(track)) => format!("Could not find track: {}", track),
            (EventKind::NotFound, None) => "Could not find track".to_string(),
            (EventKind::Success, _) => match self.stats {
                Some(stats) => format!(
                    "Found {} tracks on Spotify out of {} videos",
                    stats.found_tracks, stats.total_videos
                ),
                None => "Playlist created successfully!".to_string(),
            },
            (EventKind::Error, _) => "An error occurred while converting the playlist".to_string(),
            (EventKind::Unknown(kind), _) => kind.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EventKind, Stats, StreamEvent};
    use anyhow::Result;

    #[test]
    fn parses_searching_record() -> Result<()> {
        let event = StreamEvent::parse(br#"{"type":"searching","current":1,"total":3,"track":"A"}"#)?;
        assert_eq!(event.kind, EventKind::Searching);
        assert_eq!(event.current, Some(1));
        assert_eq!(event.total, Some(3));
        assert_eq!(event.track.as_deref(), Some("A"));
        assert_eq!(event.describe(), "Searching for track: A");
        Ok(())
    }

    #[test]
    fn parses_success_stats() -> Result<()> {
        let event = StreamEvent::parse(
            br#"{"type":"success","playlist_id":"abc","stats":{"total_videos":3,"found_tracks":1,"not_found":1}}"#,
        )?;
        assert_eq!(event.kind, EventKind::Success);
        assert!(event.kind.is_terminal());
        assert_eq!(event.playlist_id.as_deref(), Some("abc"));
        assert_eq!(
            event.stats,
            Some(Stats {
                total_videos: 3,
                found_tracks: 1,
                not_found: 1
            })
        );
        Ok(())
    }

    #[test]
    fn keeps_unknown_kind() -> Result<()> {
        let event = StreamEvent::parse(br#"{"type":"heartbeat"}"#)?;
        assert_eq!(event.kind, EventKind::Unknown("heartbeat".to_string()));
        assert!(!event.kind.is_terminal());
        assert_eq!(event.describe(), "heartbeat");
        Ok(())
    }

    #[test]
    fn message_takes_precedence() -> Result<()> {
        let event = StreamEvent::parse(br#"{"type":"error","message":"boom"}"#)?;
        assert_eq!(event.describe(), "boom");
        Ok(())
    }

    #[test]
    fn rejects_invalid_records() {
        assert!(StreamEvent::parse(b"{invalid json").is_err());
        assert!(StreamEvent::parse(br#"{"message":"no type"}"#).is_err());
        assert!(StreamEvent::parse(br#"{"type":"found","current":-1}"#).is_err());
        assert!(StreamEvent::parse(b"Searching for track: A").is_err());
        assert!(StreamEvent::parse(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn serializes_kind_as_tag() -> Result<()> {
        let event = StreamEvent::new(EventKind::NotFound);
        assert_eq!(serde_json::to_string(&event)?, r#"{"type":"not_found"}"#);
        Ok(())
    }
}
