use std::env;

/// Default exam length: 80 minutes.
pub const DEFAULT_DURATION_SECS: u32 = 80 * 60;

/// Session settings fixed before a quiz starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    duration_secs: u32,
    instant_feedback: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            instant_feedback: true,
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `QUIZ_DURATION_MINUTES` when it holds a positive integer.
    #[must_use]
    pub fn from_env() -> Self {
        let config = Self::default();
        match env::var("QUIZ_DURATION_MINUTES")
            .ok()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
        {
            Some(minutes) if minutes > 0 => config.with_duration_minutes(minutes),
            _ => config,
        }
    }

    /// Zero is bumped to one second so a started session always has a clock to run.
    #[must_use]
    pub fn with_duration_secs(mut self, secs: u32) -> Self {
        self.duration_secs = secs.max(1);
        self
    }

    #[must_use]
    pub fn with_duration_minutes(self, minutes: u32) -> Self {
        self.with_duration_secs(minutes.saturating_mul(60))
    }

    #[must_use]
    pub fn with_instant_feedback(mut self, enabled: bool) -> Self {
        self.instant_feedback = enabled;
        self
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn instant_feedback(&self) -> bool {
        self.instant_feedback
    }
}
