//! Runtime configuration for the control core.
//!
//! Every field has a default, so an empty TOML table (or `{}` in JSON)
//! deserialises to [`RuntimeConfig::default`].

use std::time::Duration;

use rover_types::{LedMode, Posture};
use serde::{Deserialize, Serialize};

/// Top-level configuration consumed by [`RobotController`][crate::RobotController].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Posture the body is assumed to be in at power-on.
    pub initial_posture: Posture,
    pub dispatch: DispatchConfig,
    pub speech: SpeechConfig,
    pub sensors: SensorConfig,
    pub interrupts: InterruptResponses,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            initial_posture: Posture::Lie,
            dispatch: DispatchConfig::default(),
            speech: SpeechConfig::default(),
            sensors: SensorConfig::default(),
            interrupts: InterruptResponses::default(),
        }
    }
}

/// Drain loop and ad hoc pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Sleep between drain loop polls when there is nothing to run.
    pub poll_interval_ms: u64,
    /// Maximum number of ad hoc actions running at once.
    pub adhoc_workers: usize,
    /// Minimum spacing between ad hoc submissions.  `0` disables the throttle.
    pub adhoc_min_interval_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            adhoc_workers: 3,
            adhoc_min_interval_ms: 500,
        }
    }
}

impl DispatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn adhoc_min_interval(&self) -> Option<Duration> {
        (self.adhoc_min_interval_ms > 0).then(|| Duration::from_millis(self.adhoc_min_interval_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub poll_interval_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self { poll_interval_ms: 50 }
    }
}

impl SpeechConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Touch and motion polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub touch_enabled: bool,
    pub touch_poll_ms: u64,
    /// Quiet period after a touch interrupt before polling resumes.
    pub touch_debounce_ms: u64,
    pub motion_enabled: bool,
    pub motion_poll_ms: u64,
    /// Accelerometer magnitude above which the body counts as lifted.
    pub lift_threshold: i32,
    /// Accelerometer magnitude below which a lifted body counts as set down.
    pub rest_threshold: i32,
    /// Consecutive samples above `lift_threshold` needed to report a lift.
    pub lift_hold_samples: u32,
    /// Sleep after a failed sensor read.
    pub fault_backoff_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            touch_enabled: true,
            touch_poll_ms: 100,
            touch_debounce_ms: 500,
            motion_enabled: true,
            motion_poll_ms: 50,
            lift_threshold: 20_000,
            rest_threshold: 17_000,
            lift_hold_samples: 3,
            fault_backoff_ms: 500,
        }
    }
}

impl SensorConfig {
    pub fn touch_poll(&self) -> Duration {
        Duration::from_millis(self.touch_poll_ms)
    }

    pub fn touch_debounce(&self) -> Duration {
        Duration::from_millis(self.touch_debounce_ms)
    }

    pub fn motion_poll(&self) -> Duration {
        Duration::from_millis(self.motion_poll_ms)
    }

    pub fn fault_backoff(&self) -> Duration {
        Duration::from_millis(self.fault_backoff_ms)
    }
}

/// LED state applied when a touch interrupt fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedSetting {
    pub mode: LedMode,
    pub color: String,
}

/// Action batches injected by the sensor interrupt router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterruptResponses {
    pub touch: Vec<String>,
    pub set_down: Vec<String>,
    pub lifted: Vec<String>,
    pub touch_led: Option<LedSetting>,
}

impl Default for InterruptResponses {
    fn default() -> Self {
        Self {
            touch: vec!["head nod".to_string(), "wag_tail".to_string()],
            set_down: vec!["stand".to_string()],
            lifted: vec!["wag_tail".to_string(), "bark".to_string()],
            touch_led: Some(LedSetting {
                mode: LedMode::Listen,
                color: "#8A2BE2".to_string(),
            }),
        }
    }
}

impl InterruptResponses {
    /// Every action name referenced by any response batch.
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.touch
            .iter()
            .chain(&self.set_down)
            .chain(&self.lifted)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
        assert_eq!(cfg.initial_posture, Posture::Lie);
        assert_eq!(cfg.dispatch.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: RuntimeConfig =
            serde_json::from_str(r#"{"sensors": {"touch_enabled": false}}"#).unwrap();
        assert!(!cfg.sensors.touch_enabled);
        assert!(cfg.sensors.motion_enabled);
        assert_eq!(cfg.sensors.lift_threshold, 20_000);
    }

    #[test]
    fn zero_interval_disables_throttle() {
        let mut d = DispatchConfig::default();
        assert_eq!(d.adhoc_min_interval(), Some(Duration::from_millis(500)));
        d.adhoc_min_interval_ms = 0;
        assert_eq!(d.adhoc_min_interval(), None);
    }

    #[test]
    fn interrupt_action_names_cover_every_batch() {
        let responses = InterruptResponses::default();
        let names: Vec<_> = responses.action_names().collect();
        assert_eq!(names, vec!["head nod", "wag_tail", "stand", "wag_tail", "bark"]);
    }
}
