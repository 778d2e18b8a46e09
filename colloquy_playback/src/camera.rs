use serde::Serialize;

/// Active camera shot and its running time. Interpolation is left to the
/// renderer; playback only tracks which shot is live and how far along it is.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CameraState {
    shot: Option<String>,
    duration: f32,
    elapsed: f32,
}

impl CameraState {
    pub fn start_shot(&mut self, name: impl Into<String>, duration: f32) {
        self.shot = Some(name.into());
        self.duration = duration.max(0.0);
        self.rewind();
    }

    pub fn rewind(&mut self) {
        self.elapsed = 0.0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn update(&mut self, elapsed: f32) {
        if self.shot.is_some() {
            self.elapsed += elapsed;
        }
    }

    pub fn shot(&self) -> Option<&str> {
        self.shot.as_deref()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Normalised shot progress in `0.0..=1.0`; zero-length shots are complete.
    pub fn progress(&self) -> f32 {
        if self.duration <= f32::EPSILON {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }
}
