use super::Persist;
use serde::{Deserialize, Serialize};

/// The Spotify access token obtained through the server's login flow.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub spotify_token: String,
}

impl Credentials {
    pub fn new(spotify_token: impl Into<String>) -> Option<Self> {
        let spotify_token = spotify_token.into().trim().to_string();
        if spotify_token.is_empty() || spotify_token == "None" {
            return None;
        }
        Some(Self { spotify_token })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("spotify_token", &"<redacted>")
            .finish()
    }
}

impl Persist for Credentials {}
