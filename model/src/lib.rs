pub mod event;

pub use event::{EventKind, Stats, StreamEvent};

pub const SPOTIFY_PLAYLIST_URL: &str = "https://open.spotify.com/playlist/";

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("record is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("record is not a valid event: {0}")]
    Json(#[from] serde_json::Error),
}

impl StreamEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, ParseError> {
        let payload = std::str::from_utf8(payload)?;
        let event = serde_json::from_str::<Self>(payload.trim())?;
        Ok(event)
    }
}
