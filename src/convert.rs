use serde::Serialize;
use synctify_persist::Credentials;
use synctify_reader::{Builder, EventStream};
use url::Url;

pub const DEFAULT_PLAYLIST_NAME: &str = "SYNCTIFY Playlist";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Please enter a YouTube playlist URL")]
    MissingUrl,
    #[error("Invalid YouTube playlist URL: {0}")]
    InvalidPlaylistUrl(String),
    #[error("bad url: {0}")]
    BadUrl(#[from] url::ParseError),
}

/// A validated request to convert one YouTube playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertRequest {
    youtube_url: Url,
    playlist_id: String,
    playlist_name: String,
}

impl ConvertRequest {
    pub fn new(youtube_url: &str, playlist_name: Option<&str>) -> Result<Self, Error> {
        let youtube_url = youtube_url.trim();
        if youtube_url.is_empty() {
            return Err(Error::MissingUrl);
        }
        let url = match Url::parse(youtube_url) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(&format!("https://{}", youtube_url))?
            }
            Err(err) => return Err(err.into()),
        };
        let playlist_id = url
            .query_pairs()
            .find(|(key, _)| key == "list")
            .map(|(_, id)| id.into_owned())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::InvalidPlaylistUrl(youtube_url.to_string()))?;

        let playlist_name = playlist_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_PLAYLIST_NAME)
            .to_string();

        Ok(Self {
            youtube_url: url,
            playlist_id,
            playlist_name,
        })
    }

    pub fn youtube_url(&self) -> &Url {
        &self.youtube_url
    }

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }

    pub fn playlist_name(&self) -> &str {
        &self.playlist_name
    }
}

#[derive(Serialize)]
struct ConvertBody<'a> {
    youtube_url: &'a str,
    playlist_name: &'a str,
    spotify_token: &'a str,
}

/// Issues conversion requests against a SYNCTIFY server.
#[derive(Debug, Clone)]
pub struct Converter {
    server: Url,
    convert_url: Url,
    login_url: Url,
    builder: Builder,
}

fn endpoint(server: &Url, path: &str) -> Result<Url, Error> {
    let mut base = server.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(path)?)
}

impl Converter {
    pub fn new(server: Url) -> Result<Self, Error> {
        Self::with_builder(server, Builder::new())
    }

    pub fn with_builder(server: Url, builder: Builder) -> Result<Self, Error> {
        Ok(Self {
            convert_url: endpoint(&server, "convert")?,
            login_url: endpoint(&server, "login")?,
            server,
            builder,
        })
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    /// Where the external Spotify login flow starts.
    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    pub async fn open(
        &self,
        request: &ConvertRequest,
        credentials: &Credentials,
    ) -> Result<EventStream, synctify_reader::Error> {
        let body = ConvertBody {
            youtube_url: request.youtube_url.as_str(),
            playlist_name: &request.playlist_name,
            spotify_token: &credentials.spotify_token,
        };
        tracing::info!(
            playlist = %request.playlist_id,
            name = %request.playlist_name,
            "starting conversion"
        );
        self.builder.open(self.convert_url.clone(), &body).await
    }
}
