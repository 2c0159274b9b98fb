use crate::log::{EventLog, LogEntry};
use synctify_model::{EventKind, StreamEvent, SPOTIFY_PLAYLIST_URL};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    Idle,
    Searching,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Connection dropped or the server refused the request.
    Transport,
    /// The Spotify token was rejected, the session was logged out.
    AuthExpired,
    /// An `error` record sent by the server.
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    pub playlist_id: Option<String>,
    pub total_items: u64,
    pub found: u64,
    pub not_found: u64,
}

impl ConversionSummary {
    pub fn url(&self) -> Option<String> {
        self.playlist_id
            .as_ref()
            .map(|id| format!("{}{}", SPOTIFY_PLAYLIST_URL, id))
    }

    pub fn message(&self) -> String {
        format!(
            "Playlist Created! Found {} out of {} tracks.",
            self.found, self.total_items
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded(ConversionSummary),
    Failed { kind: FailureKind, message: String },
}

/// Signals that a run has reached a terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    Succeeded,
    Failed,
}

/// Progress of the active conversion run.
///
/// Only [`ProgressState::apply`], [`ProgressState::fail`] and the reset
/// methods change it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    phase: Phase,
    current: u64,
    total: Option<u64>,
    current_item: String,
    found: u64,
    not_found: u64,
    log: EventLog,
    outcome: Option<Outcome>,
}

/// Folds one event into `state`.
pub fn reduce(mut state: ProgressState, event: &StreamEvent) -> (ProgressState, Option<Terminal>) {
    let terminal = state.apply(event);
    (state, terminal)
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    /// The announced number of items, `0` until the server sends one.
    pub fn total(&self) -> u64 {
        self.total.unwrap_or(0)
    }

    pub fn current_item(&self) -> &str {
        &self.current_item
    }

    pub fn found(&self) -> u64 {
        self.found
    }

    pub fn not_found(&self) -> u64 {
        self.not_found
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn summary(&self) -> Option<&ConversionSummary> {
        match &self.outcome {
            Some(Outcome::Succeeded(summary)) => Some(summary),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Some(Outcome::Failed { message, .. }) => Some(message),
            _ => None,
        }
    }

    /// Completed share of the run in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        match self.total {
            Some(total) if total > 0 => (self.current as f64 / total as f64).min(1.0),
            _ => 0.0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// A conversion was requested: clear everything and start searching.
    pub fn begin(&mut self) {
        self.reset();
        self.phase = Phase::Searching;
    }

    pub fn apply(&mut self, event: &StreamEvent) -> Option<Terminal> {
        self.log.push(LogEntry::from(event));

        if self.phase.is_terminal() {
            tracing::debug!(kind = %event.kind, phase = ?self.phase, "run already ended, event only logged");
            return None;
        }

        match &event.kind {
            EventKind::Searching => {
                self.phase = Phase::Searching;
                if let Some(total) = event.total {
                    self.total = Some(total);
                    self.current = self.current.min(total);
                }
                self.set_current(event.current);
                if let Some(track) = &event.track {
                    self.current_item = track.to_owned();
                }
                None
            }
            EventKind::Found => {
                self.phase = Phase::Searching;
                self.found += 1;
                self.set_current(event.current);
                None
            }
            EventKind::NotFound => {
                self.phase = Phase::Searching;
                self.not_found += 1;
                self.set_current(event.current);
                None
            }
            EventKind::Success => {
                let summary = match event.stats {
                    Some(stats) => ConversionSummary {
                        playlist_id: event.playlist_id.clone(),
                        total_items: stats.total_videos,
                        found: stats.found_tracks,
                        not_found: stats.not_found,
                    },
                    None => ConversionSummary {
                        playlist_id: event.playlist_id.clone(),
                        total_items: self.total().max(self.found + self.not_found),
                        found: self.found,
                        not_found: self.not_found,
                    },
                };
                self.phase = Phase::Succeeded;
                self.current_item.clear();
                self.outcome = Some(Outcome::Succeeded(summary));
                Some(Terminal::Succeeded)
            }
            EventKind::Error => {
                self.finish_failed(FailureKind::Server, event.describe());
                Some(Terminal::Failed)
            }
            EventKind::Unknown(_) => None,
        }
    }

    /// Ends the run with a failure that did not arrive as an `error` record.
    pub fn fail(&mut self, kind: FailureKind, message: impl Into<String>) -> Option<Terminal> {
        let message = message.into();
        let tag = match kind {
            FailureKind::Transport => "transport_error",
            FailureKind::AuthExpired => "auth_expired",
            FailureKind::Server => "error",
        };
        self.log.push(LogEntry::new(tag, message.as_str()));
        if self.phase.is_terminal() {
            return None;
        }
        self.finish_failed(kind, message);
        Some(Terminal::Failed)
    }

    fn finish_failed(&mut self, kind: FailureKind, message: String) {
        self.phase = Phase::Failed;
        self.current_item.clear();
        self.outcome = Some(Outcome::Failed { kind, message });
    }

    fn set_current(&mut self, current: Option<u64>) {
        if let Some(current) = current {
            self.current = match self.total {
                Some(total) => current.min(total),
                None => current,
            };
        }
    }
}
