//! Configuration Vault – reads/writes `~/.roverbyte/config.toml`.

use rover_runtime::RuntimeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted user configuration stored in `~/.roverbyte/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Actions queued by `/wake`.
    #[serde(default = "default_wake_routine")]
    pub wake_routine: Vec<String>,

    /// Control core settings.
    #[serde(default)]
    pub robot: RuntimeConfig,
}

fn default_wake_routine() -> Vec<String> {
    ["stretch", "sit", "bark", "wag_tail"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wake_routine: default_wake_routine(),
            robot: RuntimeConfig::default(),
        }
    }
}

/// Return the path to `~/.roverbyte/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".roverbyte").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `ROVER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROVER_POLL_MS` | `robot.dispatch.poll_interval_ms` |
/// | `ROVER_ADHOC_WORKERS` | `robot.dispatch.adhoc_workers` |
/// | `ROVER_TOUCH_ENABLED` | `robot.sensors.touch_enabled` |
/// | `ROVER_MOTION_ENABLED` | `robot.sensors.motion_enabled` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ROVER_POLL_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.robot.dispatch.poll_interval_ms = ms;
    }
    if let Ok(v) = std::env::var("ROVER_ADHOC_WORKERS")
        && let Ok(n) = v.parse::<usize>()
    {
        cfg.robot.dispatch.adhoc_workers = n;
    }
    if let Ok(v) = std::env::var("ROVER_TOUCH_ENABLED")
        && let Some(on) = parse_flag(&v)
    {
        cfg.robot.sensors.touch_enabled = on;
    }
    if let Ok(v) = std::env::var("ROVER_MOTION_ENABLED")
        && let Some(on) = parse_flag(&v)
    {
        cfg.robot.sensors.motion_enabled = on;
    }
}

pub(crate) fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Save the config to disk, creating `~/.roverbyte/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_types::Posture;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.wake_routine, vec!["stretch", "sit", "bark", "wag_tail"]);
        assert_eq!(loaded.robot.initial_posture, Posture::Lie);
        assert_eq!(loaded.robot.interrupts, cfg.robot.interrupts);
        assert_eq!(loaded.robot.sensors.lift_threshold, 20_000);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "wake_routine = [\"sit\"]\n\n[robot]\ninitial_posture = \"stand\"\n",
        )
        .expect("write");

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.wake_routine, vec!["sit"]);
        assert_eq!(cfg.robot.initial_posture, Posture::Stand);
        assert_eq!(cfg.robot.speech.poll_interval_ms, 50);
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "wake_routine = 7").expect("write");
        let err = load_from(&path).expect_err("should fail");
        assert!(err.starts_with("Failed to parse config"));
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = std::fs::metadata(path.parent().unwrap())
            .expect("meta")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn config_path_points_to_roverbyte_dir() {
        let p = config_path_for_home("/home/pi");
        assert!(p.to_string_lossy().contains(".roverbyte"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn apply_env_overrides_changes_poll_interval() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("ROVER_POLL_MS", "20") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.robot.dispatch.poll_interval_ms, 20);
        unsafe { std::env::remove_var("ROVER_POLL_MS") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_worker_count() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("ROVER_ADHOC_WORKERS", "lots") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.robot.dispatch.adhoc_workers, 3);
        unsafe { std::env::remove_var("ROVER_ADHOC_WORKERS") };
    }

    #[test]
    fn apply_env_overrides_toggles_sensors() {
        // SAFETY: no other test touches these variables.
        unsafe {
            std::env::set_var("ROVER_TOUCH_ENABLED", "off");
            std::env::set_var("ROVER_MOTION_ENABLED", "0");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert!(!cfg.robot.sensors.touch_enabled);
        assert!(!cfg.robot.sensors.motion_enabled);
        unsafe {
            std::env::remove_var("ROVER_TOUCH_ENABLED");
            std::env::remove_var("ROVER_MOTION_ENABLED");
        }
    }

    #[test]
    fn flag_parsing() {
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
