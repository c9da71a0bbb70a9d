//! `rover-types` – shared vocabulary for the RoverByte control core.
//!
//! Every other crate in the workspace speaks in these types: postures,
//! action batches, queue modes, raw sensor states, and the global
//! [`RoverError`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Posture
// ────────────────────────────────────────────────────────────────────────────

/// One of the robot's three discrete stable body configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Posture {
    Stand,
    Sit,
    Lie,
}

impl Posture {
    /// Name of the driver preset that moves the body into this posture.
    pub fn preset(self) -> &'static str {
        match self {
            Posture::Stand => "stand",
            Posture::Sit => "sit",
            Posture::Lie => "lie",
        }
    }
}

impl fmt::Display for Posture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.preset())
    }
}

impl FromStr for Posture {
    type Err = RoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stand" => Ok(Posture::Stand),
            "sit" => Ok(Posture::Sit),
            "lie" => Ok(Posture::Lie),
            other => Err(RoverError::Config(format!("unknown posture '{other}'"))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Batches
// ────────────────────────────────────────────────────────────────────────────

/// What a [`BatchItem`] asks the robot to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Run a named action from the catalog.
    Action,
    /// Play an audio handle.
    Speech,
}

/// A single `{kind, value}` entry of an [`ActionBatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub kind: ItemKind,
    pub value: String,
}

impl BatchItem {
    pub fn action(name: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Action,
            value: name.into(),
        }
    }

    pub fn speech(audio: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Speech,
            value: audio.into(),
        }
    }
}

/// An ordered sequence of action/speech items produced by one interaction.
///
/// Created per interaction, consumed item-by-item, discarded after it has
/// been fully drained or flushed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionBatch {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub items: Vec<BatchItem>,
}

impl ActionBatch {
    pub fn new(items: Vec<BatchItem>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            items,
        }
    }

    /// Build a batch made only of action items.
    pub fn from_actions<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(BatchItem::action).collect())
    }

    /// Names of the action items, in submission order.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|i| i.kind == ItemKind::Action)
            .map(|i| i.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Queue mode
// ────────────────────────────────────────────────────────────────────────────

/// Process-wide dispatcher mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    /// Nothing is being drained.
    #[default]
    Standby,
    /// The drain loop is consuming the pending sequence.
    RunningBatch,
    /// The AI layer is composing a reply; pending items are held.
    Thinking,
}

impl fmt::Display for QueueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueMode::Standby => f.write_str("standby"),
            QueueMode::RunningBatch => f.write_str("running_batch"),
            QueueMode::Thinking => f.write_str("thinking"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Hardware-facing values
// ────────────────────────────────────────────────────────────────────────────

/// Reading from the dual touch pad on the robot's head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TouchState {
    #[default]
    Idle,
    Left,
    Right,
    LeftSlide,
    RightSlide,
}

impl TouchState {
    pub fn is_idle(self) -> bool {
        self == TouchState::Idle
    }
}

impl FromStr for TouchState {
    type Err = RoverError;

    /// Parse the single-letter codes reported by the touch controller
    /// (`N`, `L`, `R`, `LS`, `RS`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "N" => Ok(TouchState::Idle),
            "L" => Ok(TouchState::Left),
            "R" => Ok(TouchState::Right),
            "LS" => Ok(TouchState::LeftSlide),
            "RS" => Ok(TouchState::RightSlide),
            other => Err(RoverError::SensorFault {
                sensor: "touch".to_string(),
                details: format!("unrecognised touch code '{other}'"),
            }),
        }
    }
}

/// Head orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPose {
    pub yaw: f32,
    pub roll: f32,
    pub pitch: f32,
}

impl HeadPose {
    pub fn new(yaw: f32, roll: f32, pitch: f32) -> Self {
        Self { yaw, roll, pitch }
    }

    /// Facing straight ahead.
    pub fn level() -> Self {
        Self::default()
    }
}

/// Target angles for the eight leg servos, in degrees.
pub type LegFrame = [f32; 8];

/// Animation style of the RGB strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedMode {
    Breath,
    Boom,
    Bark,
    Speak,
    Listen,
    Monochromatic,
}

/// Opaque reference to a playable audio clip (usually a synthesized file).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioHandle(PathBuf);

impl AudioHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for AudioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Global error type for the control core.
///
/// None of these are fatal: each is contained to the smallest unit (one
/// action, one sensor read, one playback) and logged by whoever catches it.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoverError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Actuator Fault on {component}: {details}")]
    ActuatorFault { component: String, details: String },

    #[error("Sensor Fault on {sensor}: {details}")]
    SensorFault { sensor: String, details: String },

    #[error("Audio Fault: {0}")]
    AudioFault(String),

    #[error("Action '{action}' chains to unknown action '{target}'")]
    UnresolvedChain { action: String, target: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Dispatch Error: {0}")]
    Dispatch(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posture_parses_case_insensitively() {
        assert_eq!("SIT".parse::<Posture>().unwrap(), Posture::Sit);
        assert_eq!(" stand ".parse::<Posture>().unwrap(), Posture::Stand);
        assert!(matches!(
            "crouch".parse::<Posture>(),
            Err(RoverError::Config(_))
        ));
    }

    #[test]
    fn posture_serializes_lowercase() {
        let json = serde_json::to_string(&Posture::Lie).unwrap();
        assert_eq!(json, "\"lie\"");
    }

    #[test]
    fn batch_from_actions_keeps_order() {
        let batch = ActionBatch::from_actions(["sit", "bark", "wag_tail"]);
        let names: Vec<&str> = batch.actions().collect();
        assert_eq!(names, vec!["sit", "bark", "wag_tail"]);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn batch_actions_skips_speech_items() {
        let batch = ActionBatch::new(vec![
            BatchItem::speech("hello.wav"),
            BatchItem::action("nod"),
        ]);
        assert_eq!(batch.actions().collect::<Vec<_>>(), vec!["nod"]);
    }

    #[test]
    fn batch_item_json_shape() {
        let item = BatchItem::action("bark");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "action");
        assert_eq!(json["value"], "bark");
    }

    #[test]
    fn touch_codes_parse() {
        assert_eq!("N".parse::<TouchState>().unwrap(), TouchState::Idle);
        assert_eq!("LS".parse::<TouchState>().unwrap(), TouchState::LeftSlide);
        assert!(!TouchState::Right.is_idle());
        assert!(matches!(
            "X".parse::<TouchState>(),
            Err(RoverError::SensorFault { .. })
        ));
    }

    #[test]
    fn queue_mode_defaults_to_standby() {
        assert_eq!(QueueMode::default(), QueueMode::Standby);
        assert_eq!(QueueMode::RunningBatch.to_string(), "running_batch");
    }

    #[test]
    fn rover_error_display() {
        let err = RoverError::UnknownAction("moonwalk".to_string());
        assert!(err.to_string().contains("moonwalk"));

        let err2 = RoverError::ActuatorFault {
            component: "legs".to_string(),
            details: "servo stalled".to_string(),
        };
        assert!(err2.to_string().contains("legs"));
    }
}
