use serde::Serialize;

/// Speech progress of one on-stage actor slot.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ActorPlaybackState {
    speech_length: f32,
    elapsed_time: f32,
    text: Option<String>,
}

impl ActorPlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new line of speech lasting `length` seconds.
    pub fn begin_speech(&mut self, length: f32, text: Option<String>) {
        self.speech_length = length.max(0.0);
        self.elapsed_time = 0.0;
        self.text = text;
    }

    pub fn update(&mut self, elapsed: f32) {
        self.elapsed_time += elapsed;
        if self.is_speech_done() {
            self.text = None;
        }
    }

    pub fn is_speech_done(&self) -> bool {
        self.elapsed_time >= self.speech_length
    }

    pub fn reset(&mut self) {
        self.speech_length = 0.0;
        self.elapsed_time = 0.0;
        self.text = None;
    }

    pub fn speech_length(&self) -> f32 {
        self.speech_length
    }

    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    /// Subtitle shown while the actor is speaking.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_actor_is_done() {
        assert!(ActorPlaybackState::new().is_speech_done());
    }

    #[test]
    fn speech_completes_and_releases_text() {
        let mut actor = ActorPlaybackState::new();
        actor.begin_speech(1.0, Some("Hello.".to_string()));
        actor.update(0.4);
        assert!(!actor.is_speech_done());
        assert_eq!(actor.text(), Some("Hello."));

        actor.update(0.6);
        assert!(actor.is_speech_done());
        assert_eq!(actor.text(), None);
    }

    #[test]
    fn done_stays_done_until_reset() {
        let mut actor = ActorPlaybackState::new();
        actor.begin_speech(0.5, None);
        actor.update(0.5);
        for _ in 0..3 {
            actor.update(0.1);
            assert!(actor.is_speech_done());
        }

        actor.reset();
        assert_eq!(actor.speech_length(), 0.0);
        assert_eq!(actor.elapsed_time(), 0.0);
        assert!(actor.is_speech_done());
    }
}
