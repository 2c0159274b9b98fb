mod cli;

use anyhow::Result;
use clap::Parser;
use synctify::persist::{Config, Credentials};
use synctify::render::TerminalRenderer;
use synctify::{ConvertRequest, Converter, Outcome, Session, SPLASH_LOGO};
use tokio::signal;
use tracing_subscriber::EnvFilter;

async fn convert(session: &mut Session, opts: cli::ConvertOptions) -> Result<bool> {
    let request = ConvertRequest::new(&opts.url, opts.name.as_deref())?;
    println!(
        "Converting playlist {} into \"{}\"",
        request.playlist_id(),
        request.playlist_name()
    );
    session.start(request)?;

    let mut renderer = TerminalRenderer::new();
    let interrupted = tokio::select! {
        res = session.run(&mut renderer) => {
            res?;
            false
        }
        _ = signal::ctrl_c() => true,
    };
    if interrupted {
        session.cancel();
        eprintln!("conversion cancelled");
        return Ok(false);
    }

    match session.state().outcome() {
        Some(Outcome::Succeeded(summary)) => {
            if let Some(url) = summary.url().filter(|_| opts.open) {
                if let Err(err) = webbrowser::open(&url) {
                    tracing::warn!("failed to open {}: {}", url, err);
                }
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}

async fn login(session: &mut Session, opts: cli::LoginOptions) -> Result<()> {
    let token = match opts.token {
        Some(token) => token,
        None => {
            let login_url = session.converter().login_url().to_string();
            println!("Login with Spotify at {}", login_url);
            if !opts.no_browser {
                if let Err(err) = webbrowser::open(&login_url) {
                    tracing::warn!("failed to open {}: {}", login_url, err);
                }
            }
            dialoguer::Password::new()
                .with_prompt("Spotify token")
                .interact()?
        }
    };
    let credentials =
        Credentials::new(token).ok_or_else(|| anyhow::anyhow!("the spotify token is empty"))?;
    session.login(credentials).await?;
    println!("✓ Connected to Spotify");
    Ok(())
}

async fn run(opts: cli::Opts) -> Result<bool> {
    let config_dir = match opts.config_dir {
        Some(dir) => dir,
        None => Config::default_dir()?,
    };
    let mut config = Config::open(&config_dir).await?;
    if let cli::Command::Server(opts) = &opts.command {
        config.set_server(opts.url.clone()).await?;
        println!("default server set to {}", config.settings.server);
        return Ok(true);
    }
    let server = opts
        .server
        .unwrap_or_else(|| config.settings.server.clone());
    let converter = Converter::new(server)?;
    let mut session = Session::new(converter, config.credentials_file.clone());
    session.restore().await?;

    match opts.command {
        cli::Command::Login(opts) => login(&mut session, opts).await?,
        cli::Command::Logout => {
            session.logout().await?;
            println!("Logged out");
        }
        cli::Command::Status => {
            println!("{}", SPLASH_LOGO);
            println!("server: {}", session.converter().server());
            if session.is_logged_in() {
                println!("Connected to Spotify, ready to convert playlists");
            } else {
                println!("Not connected to Spotify, run `synctify login`");
            }
        }
        cli::Command::Convert(opts) => return convert(&mut session, opts).await,
        cli::Command::Server(_) => {}
    };
    Ok(true)
}

fn main() -> Result<()> {
    // load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = cli::Opts::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let succeeded = runtime.block_on(run(opts))?;
    runtime.shutdown_background();
    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
