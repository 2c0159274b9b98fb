use clap::Parser;
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug, Clone)]
pub struct LoginOptions {
    #[clap(long = "token", env = "SPOTIFY_TOKEN", help = "spotify access token")]
    pub token: Option<String>,
    #[clap(long = "no-browser", help = "do not open the login page")]
    pub no_browser: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ConvertOptions {
    #[clap(help = "youtube playlist url")]
    pub url: String,
    #[clap(short = 'n', long = "name", env = "SYNCTIFY_PLAYLIST_NAME")]
    pub name: Option<String>,
    #[clap(long = "open", help = "open the created playlist in the browser")]
    pub open: bool,
}

#[derive(Parser, Debug, Clone)]
pub enum Command {
    #[clap(name = "login", about = "connect with spotify")]
    Login(LoginOptions),
    #[clap(name = "logout", about = "forget the spotify token")]
    Logout,
    #[clap(name = "convert", about = "convert a youtube playlist to a spotify playlist")]
    Convert(ConvertOptions),
    #[clap(name = "status", about = "show the session status")]
    Status,
    #[clap(name = "server", about = "set the default conversion server")]
    Server(ServerOptions),
}

#[derive(Parser, Debug, Clone)]
pub struct ServerOptions {
    #[clap(help = "conversion server url")]
    pub url: Url,
}

#[derive(Parser, Debug, Clone)]
#[clap(
    name = "synctify",
    version = option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
    about = "Transform YouTube playlists into Spotify playlists",
)]
pub struct Opts {
    #[clap(long = "server", env = "SYNCTIFY_SERVER")]
    pub server: Option<Url>,
    #[clap(long = "config-dir", env = "SYNCTIFY_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}
