//! Terminal progress for a running update
//!
//! [`UpdateProgress`] follows the state channel of an
//! [`Update`](crate::update::Update) and draws it with `indicatif`: a bar while
//! the archive downloads, a spinner while it is unpacked and installed, and a
//! final line with the outcome.
//!
//! # Environment Variables
//!
//! - `RELEASE_UPDATER_NO_PROGRESS`: set to any value to hide all indicators
//!
//! # Examples
//!
//! ```rust,no_run
//! use release_updater::utils::progress::UpdateProgress;
//! # async fn example(update: release_updater::update::Update) -> anyhow::Result<()> {
//! let progress = UpdateProgress::new(true);
//! let receiver = update.subscribe();
//! update.start()?;
//! let state = progress.follow(receiver).await;
//! println!("{state}");
//! # Ok(())
//! # }
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;
use tokio::sync::watch;

use crate::update::UpdateState;

/// Environment variable disabling every progress indicator.
pub const NO_PROGRESS_ENV: &str = "RELEASE_UPDATER_NO_PROGRESS";

/// Resolution of the download bar; fractions are drawn in thousandths.
const BAR_STEPS: u64 = 1000;

/// True when `RELEASE_UPDATER_NO_PROGRESS` is set to any value.
fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some()
}

/// Styles shared by the progress indicators.
pub struct ProgressStyle;

impl ProgressStyle {
    /// Bar used while downloading.
    ///
    /// ```text
    /// Downloading... [━━━━━━━━━━━━━━━━━━━━╸━━━━━━━━━━━━━━━━━━━]  52%
    /// ```
    #[must_use]
    pub fn download() -> IndicatifStyle {
        IndicatifStyle::default_bar()
            .template("{msg:.bold.cyan} [{bar:40.cyan/blue}] {percent:>3}%")
            .unwrap_or_else(|_| IndicatifStyle::default_bar())
            .progress_chars("━╸━")
    }

    /// Spinner used while unpacking and installing.
    #[must_use]
    pub fn spinner() -> IndicatifStyle {
        IndicatifStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| IndicatifStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
    }
}

/// Draws an update's state on the terminal.
pub struct UpdateProgress {
    bar: IndicatifBar,
    phase: Option<&'static str>,
}

impl UpdateProgress {
    /// A renderer, hidden when `enabled` is false or progress is disabled
    /// through the environment.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        let bar = if enabled && !is_progress_disabled() {
            IndicatifBar::new(BAR_STEPS)
        } else {
            IndicatifBar::hidden()
        };
        Self { bar, phase: None }
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }

    /// Draw one state.
    pub fn render(&mut self, state: &UpdateState) {
        let phase = state.name();
        let entering = self.phase != Some(phase);
        self.phase = Some(phase);

        match state {
            UpdateState::Waiting => {}
            UpdateState::Downloading(fraction) => {
                if entering {
                    self.bar.set_style(ProgressStyle::download());
                    self.bar.set_message(state.label());
                }
                self.bar.set_position(bar_position(*fraction));
            }
            UpdateState::Extracting | UpdateState::Installing => {
                if entering {
                    self.bar.set_style(ProgressStyle::spinner());
                    self.bar.enable_steady_tick(Duration::from_millis(100));
                    self.bar.set_message(state.label());
                }
            }
            UpdateState::Completed | UpdateState::Canceled => {
                self.bar.disable_steady_tick();
                self.bar.finish_and_clear();
            }
            UpdateState::Failed(_) => {
                self.bar.disable_steady_tick();
                self.bar.abandon_with_message(state.label());
            }
        }
    }

    /// Render every state published on `receiver` until a terminal one.
    ///
    /// Returns the terminal state, or the last state seen if the update was
    /// dropped first.
    pub async fn follow(mut self, mut receiver: watch::Receiver<UpdateState>) -> UpdateState {
        loop {
            let state = receiver.borrow_and_update().clone();
            self.render(&state);
            if state.is_terminal() {
                return state;
            }
            if receiver.changed().await.is_err() {
                return receiver.borrow().clone();
            }
        }
    }
}

fn bar_position(fraction: f64) -> u64 {
    let clamped = fraction.clamp(0.0, 1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let position = (clamped * BAR_STEPS as f64).round() as u64;
    position
}
