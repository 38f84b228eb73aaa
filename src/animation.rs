// ⏯️ Animation Controller
// Play/pause flag plus a cyclic cursor over the animated years

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// YEAR RANGE
// ============================================================================

/// Fixed, ordered, non-empty sequence of years the animation cycles through
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearRange {
    years: Vec<i32>,
}

impl YearRange {
    pub fn new(mut years: Vec<i32>) -> Result<Self> {
        years.sort_unstable();
        years.dedup();
        if years.is_empty() {
            bail!("year range is empty");
        }
        Ok(YearRange { years })
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn first(&self) -> i32 {
        self.years[0]
    }

    pub fn contains(&self, year: i32) -> bool {
        self.years.binary_search(&year).is_ok()
    }

    /// Year after `year`, wrapping to the start. A year outside the range
    /// restarts the cycle.
    pub fn next_after(&self, year: i32) -> i32 {
        match self.years.binary_search(&year) {
            Ok(index) => self.years[(index + 1) % self.years.len()],
            Err(_) => {
                debug!(year, "displayed year is outside the animation range; restarting");
                self.first()
            }
        }
    }
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    #[default]
    Paused,
    Playing,
}

impl PlayState {
    pub fn flipped(self) -> Self {
        match self {
            PlayState::Paused => PlayState::Playing,
            PlayState::Playing => PlayState::Paused,
        }
    }

    pub fn is_playing(self) -> bool {
        self == PlayState::Playing
    }

    /// Button caption
    pub fn label(self) -> &'static str {
        match self {
            PlayState::Paused => "Play",
            PlayState::Playing => "Pause",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnimationState {
    pub play_state: PlayState,
    pub current_year: i32,
}

/// What each controller call hands back to the front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationFrame {
    pub year: i32,
    pub playing: bool,
}

// ============================================================================
// CONTROLLER
// ============================================================================

/// Drives the map's year. Starts paused at the first year of the range and
/// has no terminal state.
#[derive(Debug, Clone)]
pub struct AnimationController {
    range: YearRange,
    state: AnimationState,
}

impl AnimationController {
    pub fn new(range: YearRange) -> Self {
        let state = AnimationState {
            play_state: PlayState::Paused,
            current_year: range.first(),
        };
        AnimationController { range, state }
    }

    /// Controller for a viewer whose session was dropped: same range, with
    /// the play flag the viewer last saw
    pub fn resumed(range: YearRange, playing: bool) -> Self {
        let mut controller = Self::new(range);
        if playing {
            controller.state.play_state = PlayState::Playing;
        }
        controller
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn range(&self) -> &YearRange {
        &self.range
    }

    pub fn frame(&self) -> AnimationFrame {
        AnimationFrame {
            year: self.state.current_year,
            playing: self.state.play_state.is_playing(),
        }
    }

    /// Play/pause button. `clicks` is the button's click counter; only a
    /// genuine click (`Some(n)` with `n > 0`) flips the state, so the
    /// initial no-click invocation is a no-op.
    pub fn toggle(&mut self, clicks: Option<u64>) -> AnimationFrame {
        if clicks.is_some_and(|n| n > 0) {
            self.state.play_state = self.state.play_state.flipped();
            debug!(state = ?self.state.play_state, "animation toggled");
        }
        self.frame()
    }

    /// Timer tick. While playing, advances from `displayed_year` to the next
    /// year in the range; while paused, `displayed_year` is returned as is.
    pub fn tick(&mut self, displayed_year: i32) -> AnimationFrame {
        self.state.current_year = if self.state.play_state.is_playing() {
            self.range.next_after(displayed_year)
        } else {
            displayed_year
        };
        self.frame()
    }

    /// Manual year selection; always takes effect, whatever the play state
    pub fn select_year(&mut self, year: i32) -> AnimationFrame {
        self.state.current_year = year;
        self.frame()
    }
}
