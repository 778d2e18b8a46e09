use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("reading playback options {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing playback options: {0}")]
    Json(#[from] serde_json::Error),
    #[error("fast_forward_step must be positive (got {0})")]
    InvalidStep(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackOptions {
    /// Command, trigger and actor add/remove actions advance on their own
    /// instead of holding until the host continues.
    pub auto_advance_commands: bool,
    /// Frame length used by fast-forwarding speech, in seconds.
    pub fast_forward_step: f32,
    /// Upper bound of fast-forward steps per call.
    pub fast_forward_limit: u32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            auto_advance_commands: true,
            fast_forward_step: 0.1,
            fast_forward_limit: 10_000,
        }
    }
}

impl PlaybackOptions {
    pub fn from_json_str(text: &str) -> Result<Self, OptionsError> {
        let options: PlaybackOptions = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, OptionsError> {
        let text = fs::read_to_string(path).map_err(|source| OptionsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.fast_forward_step <= 0.0 || !self.fast_forward_step.is_finite() {
            return Err(OptionsError::InvalidStep(self.fast_forward_step));
        }
        Ok(())
    }
}
