//! Generic `AudioOutput` trait for the robot's speaker.

use rover_types::{AudioHandle, RoverError};

/// Plays synthesized speech or sound effects.
pub trait AudioOutput: Send + Sync {
    /// Play `audio` and block the calling thread until playback naturally
    /// ends.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::AudioFault`] if the clip cannot be opened or the
    /// output device fails.
    fn play_blocking(&self, audio: &AudioHandle) -> Result<(), RoverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mute;

    impl AudioOutput for Mute {
        fn play_blocking(&self, audio: &AudioHandle) -> Result<(), RoverError> {
            if audio.path().as_os_str().is_empty() {
                return Err(RoverError::AudioFault("empty audio handle".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn mute_output_rejects_empty_handle() {
        let out = Mute;
        assert!(out.play_blocking(&AudioHandle::new("hello.wav")).is_ok());
        assert!(matches!(
            out.play_blocking(&AudioHandle::new("")),
            Err(RoverError::AudioFault(_))
        ));
    }
}
