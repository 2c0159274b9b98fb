use crate::progress::{Outcome, Phase, ProgressState};
use indicatif::{ProgressBar, ProgressStyle};

/// Number of log entries shown while a run is in progress.
pub const VISIBLE_LOG_ENTRIES: usize = 5;

/// Receives the progress state after every reduction.
pub trait Render {
    fn render(&mut self, state: &ProgressState);

    fn finish(&mut self, state: &ProgressState) {
        self.render(state);
    }
}

pub struct TerminalRenderer {
    bar: ProgressBar,
    printed: u64,
    phase: Phase,
}

impl std::fmt::Debug for TerminalRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalRenderer")
            .field("printed", &self.printed)
            .finish()
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalRenderer {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.green/white}] {pos}/{len} {wide_msg}")
                .progress_chars("=> "),
        );
        Self::with_bar(bar)
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            printed: 0,
            phase: Phase::Idle,
        }
    }

    /// Number of log entries to print for this frame, marking them as seen.
    fn take_unseen(&mut self, state: &ProgressState) -> usize {
        let log = state.log();
        let restarted = state.phase() == Phase::Searching && self.phase != Phase::Searching;
        if restarted || log.appended() < self.printed {
            // a new run started with a fresh log
            self.printed = 0;
        }
        self.phase = state.phase();
        let unseen = log.appended().saturating_sub(self.printed) as usize;
        self.printed = log.appended();
        unseen.min(VISIBLE_LOG_ENTRIES)
    }

    fn print_new_entries(&mut self, state: &ProgressState) {
        let unseen = self.take_unseen(state);
        for entry in state.log().recent(unseen) {
            self.bar.println(entry.to_string());
        }
    }
}

impl Render for TerminalRenderer {
    fn render(&mut self, state: &ProgressState) {
        self.print_new_entries(state);
        self.bar.set_length(state.total());
        self.bar.set_position(state.current());
        let message = match state.phase() {
            Phase::Searching if !state.current_item().is_empty() => format!(
                "{} (found {}, not found {}, {:.0}%)",
                state.current_item(),
                state.found(),
                state.not_found(),
                state.fraction() * 100.0
            ),
            Phase::Searching | Phase::Idle => "Converting ...".to_string(),
            Phase::Succeeded | Phase::Failed => String::new(),
        };
        self.bar.set_message(message);
        self.bar.tick();
    }

    fn finish(&mut self, state: &ProgressState) {
        self.print_new_entries(state);
        self.bar.finish_and_clear();
        match state.outcome() {
            Some(Outcome::Succeeded(summary)) => {
                println!("✅ {}", summary.message());
                if let Some(url) = summary.url() {
                    println!("🔗 {}", url);
                }
            }
            Some(Outcome::Failed { message, .. }) => eprintln!("❌ {}", message),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Render, TerminalRenderer, VISIBLE_LOG_ENTRIES};
    use crate::progress::ProgressState;
    use indicatif::ProgressBar;
    use synctify_model::StreamEvent;

    fn apply(state: &mut ProgressState, json: &str) {
        state.apply(&StreamEvent::parse(json.as_bytes()).expect("valid test event"));
    }

    fn searching(state: &mut ProgressState, n: usize) {
        for i in 0..n {
            apply(state, &format!(r#"{{"type":"searching","current":{},"total":50}}"#, i));
        }
    }

    #[test]
    fn test_prints_at_most_visible_entries() {
        let mut renderer = TerminalRenderer::with_bar(ProgressBar::hidden());
        let mut state = ProgressState::new();
        state.begin();
        searching(&mut state, 7);
        assert_eq!(renderer.take_unseen(&state), VISIBLE_LOG_ENTRIES);
        assert_eq!(renderer.take_unseen(&state), 0);

        apply(&mut state, r#"{"type":"found","current":7}"#);
        assert_eq!(renderer.take_unseen(&state), 1);

        // entries evicted from the log still count as seen
        searching(&mut state, 30);
        assert_eq!(renderer.take_unseen(&state), VISIBLE_LOG_ENTRIES);
    }

    #[test]
    fn test_reused_renderer_prints_new_run() {
        let mut renderer = TerminalRenderer::with_bar(ProgressBar::hidden());
        let mut state = ProgressState::new();
        state.begin();
        searching(&mut state, 3);
        apply(&mut state, r#"{"type":"success","playlist_id":"abc"}"#);
        renderer.render(&state);
        renderer.finish(&state);

        state.begin();
        searching(&mut state, 5);
        assert_eq!(renderer.take_unseen(&state), 5);
    }
}
