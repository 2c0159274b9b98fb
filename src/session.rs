use crate::convert::{ConvertRequest, Converter};
use crate::progress::{FailureKind, Phase, ProgressState, Terminal};
use crate::render::Render;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use synctify_model::StreamEvent;
use synctify_persist::{ConfigError, Credentials, Persist};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub type Epoch = u64;

pub const AUTH_EXPIRED_MESSAGE: &str = "Spotify authentication expired. Please login again.";
pub const CLOSED_MESSAGE: &str = "connection closed before the conversion finished";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Please login with Spotify first")]
    NotLoggedIn,
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

/// Output of a run task, tagged with the epoch of the run.
#[derive(Debug)]
pub enum Update {
    Event { epoch: Epoch, event: StreamEvent },
    Failed { epoch: Epoch, error: synctify_reader::Error },
    Closed { epoch: Epoch },
}

impl Update {
    pub fn epoch(&self) -> Epoch {
        match self {
            Self::Event { epoch, .. } | Self::Failed { epoch, .. } | Self::Closed { epoch } => *epoch,
        }
    }
}

/// A logged in user and their (at most one) running conversion.
///
/// Every run gets a new epoch. Updates are only folded into the state
/// while their epoch is current, so a superseded run can never touch the
/// state of a newer one.
pub struct Session {
    converter: Arc<Converter>,
    credentials_file: PathBuf,
    credentials: Option<Credentials>,
    state: ProgressState,
    epoch: Epoch,
    task: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Update>,
    rx: mpsc::UnboundedReceiver<Update>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("server", self.converter.server())
            .field("logged_in", &self.is_logged_in())
            .field("epoch", &self.epoch)
            .field("phase", &self.state.phase())
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn stream_updates(
    converter: Arc<Converter>,
    request: ConvertRequest,
    credentials: Credentials,
    epoch: Epoch,
    tx: mpsc::UnboundedSender<Update>,
) {
    let mut stream = match converter.open(&request, &credentials).await {
        Ok(stream) => stream,
        Err(error) => {
            let _ = tx.send(Update::Failed { epoch, error });
            return;
        }
    };
    while let Some(item) = stream.next().await {
        let update = match item {
            Ok(event) => Update::Event { epoch, event },
            Err(error) => Update::Failed { epoch, error },
        };
        if tx.send(update).is_err() {
            return;
        }
    }
    let _ = tx.send(Update::Closed { epoch });
}

impl Session {
    pub fn new(converter: Converter, credentials_file: impl Into<PathBuf>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            converter: Arc::new(converter),
            credentials_file: credentials_file.into(),
            credentials: None,
            state: ProgressState::new(),
            epoch: 0,
            task: None,
            tx,
            rx,
        }
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn is_logged_in(&self) -> bool {
        self.credentials.is_some()
    }

    /// Picks up credentials persisted by an earlier login.
    pub async fn restore(&mut self) -> Result<bool, Error> {
        match Credentials::load(&self.credentials_file).await {
            Ok(credentials) => {
                self.credentials = Some(credentials);
                Ok(true)
            }
            Err(ConfigError::IO(err)) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(ConfigError::ParseError(err)) => {
                tracing::warn!("discarding unreadable credentials: {}", err);
                Credentials::remove(&self.credentials_file).await?;
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn login(&mut self, credentials: Credentials) -> Result<(), Error> {
        credentials.save(&self.credentials_file).await?;
        self.credentials = Some(credentials);
        tracing::info!("logged in");
        Ok(())
    }

    /// Cancels any running conversion, resets progress and forgets the token.
    pub async fn logout(&mut self) -> Result<(), Error> {
        self.cancel();
        self.state.reset();
        self.forget_credentials().await
    }

    async fn forget_credentials(&mut self) -> Result<(), Error> {
        self.credentials = None;
        Credentials::remove(&self.credentials_file).await?;
        tracing::info!("logged out");
        Ok(())
    }

    /// Abandons the running conversion, if any.
    ///
    /// Bumping the epoch drops updates the old task already queued.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(epoch = self.epoch, "cancelled conversion");
        }
        self.epoch += 1;
    }

    pub fn start(&mut self, request: ConvertRequest) -> Result<Epoch, Error> {
        let credentials = self.credentials.clone().ok_or(Error::NotLoggedIn)?;
        self.cancel();
        self.state.begin();

        let epoch = self.epoch;
        self.task = Some(tokio::spawn(stream_updates(
            self.converter.clone(),
            request,
            credentials,
            epoch,
            self.tx.clone(),
        )));
        Ok(epoch)
    }

    /// Waits for the next update of any run. `None` when nothing is running.
    pub async fn next_update(&mut self) -> Option<Update> {
        if self.task.is_none() {
            return self.rx.try_recv().ok();
        }
        self.rx.recv().await
    }

    pub async fn apply(&mut self, update: Update) -> Result<Option<Terminal>, Error> {
        if update.epoch() != self.epoch {
            tracing::debug!(
                stale = update.epoch(),
                current = self.epoch,
                "discarding update of superseded run"
            );
            return Ok(None);
        }
        let terminal = match update {
            Update::Event { event, .. } => self.state.apply(&event),
            Update::Failed { error, .. } if error.is_auth_expired() => {
                tracing::warn!("authentication expired: {}", error);
                let terminal = self.state.fail(FailureKind::AuthExpired, AUTH_EXPIRED_MESSAGE);
                self.cancel();
                self.forget_credentials().await?;
                terminal
            }
            Update::Failed { error, .. } => {
                tracing::warn!("conversion failed: {}", error);
                self.state.fail(FailureKind::Transport, error.to_string())
            }
            Update::Closed { .. } => {
                self.task = None;
                if self.state.phase().is_terminal() {
                    None
                } else {
                    self.state.fail(FailureKind::Transport, CLOSED_MESSAGE)
                }
            }
        };
        Ok(terminal)
    }

    /// Drives the current run until it ends, rendering after every update.
    pub async fn run<R>(&mut self, renderer: &mut R) -> Result<Phase, Error>
    where
        R: Render + ?Sized,
    {
        renderer.render(&self.state);
        while !self.state.phase().is_terminal() {
            let update = match self.next_update().await {
                Some(update) => update,
                None => break,
            };
            let stale = update.epoch() != self.epoch;
            self.apply(update).await?;
            if !stale {
                renderer.render(&self.state);
            }
        }
        renderer.finish(&self.state);
        Ok(self.state.phase())
    }
}
