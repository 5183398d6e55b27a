use crate::traffic::DEFAULT_NEAR_STATIONARY_SPEED;
use crate::{ConfigError, ControllerError};
use common::error::MultiError;
use common::saveload::JSON;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// How the controller decides phase lengths.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    /// Arms no timer; the backend's own timing governs the signal.
    #[default]
    Off,
    /// Steps through the plan with its configured durations.
    FixedTime,
    /// Periodically redistributes non-transitional time by measured demand.
    HighDensity,
    /// Extends the running phase while vehicles are about to reach the stop line.
    LowDensityExtend,
}

impl ControlMode {
    pub fn arms_switch_timer(self) -> bool {
        !matches!(self, ControlMode::Off)
    }

    pub fn arms_recalculation_timer(self) -> bool {
        matches!(self, ControlMode::HighDensity)
    }
}

impl FromStr for ControlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &*s.to_ascii_lowercase() {
            "off" => Ok(ControlMode::Off),
            "fixed" | "fixed-time" => Ok(ControlMode::FixedTime),
            "high" | "high-density" => Ok(ControlMode::HighDensity),
            "low" | "low-density" => Ok(ControlMode::LowDensityExtend),
            _ => Err(format!(
                "unknown mode {:?}, expected off, fixed-time, high-density or low-density",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub mode: ControlMode,
    /// Seconds between two demand recalculations (high density only)
    pub recalculation_interval: f64,
    /// Seconds added per extension, also the arrival look-ahead (low density only)
    pub extension_window: f64,
    /// A phase is never extended once it has run this long
    pub max_phase_duration: f64,
    /// Floor applied by redistribution
    pub min_phase_duration: f64,
    pub near_stationary_speed: f64,
    /// Remaining duration given to the backend so its own phase expiry never fires
    pub suppress_duration: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            mode: ControlMode::Off,
            recalculation_interval: 30.0,
            extension_window: 5.0,
            max_phase_duration: 60.0,
            min_phase_duration: 3.0,
            near_stationary_speed: DEFAULT_NEAR_STATIONARY_SPEED,
            suppress_duration: 10_000_000.0,
        }
    }
}

impl SignalConfig {
    pub fn with_mode(mode: ControlMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Loads from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ControllerError> {
        let config: Self = common::saveload::load::<JSON, _>(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reports every invalid field at once. Fields only used by other modes are not checked.
    pub fn validate(&self) -> Result<(), MultiError<ConfigError>> {
        let mut errors = MultiError::default();

        let mut positive = |field: &'static str, value: f64| {
            if !(value > 0.0 && value.is_finite()) {
                errors.push(ConfigError::NonPositive { field, value });
            }
        };

        if self.mode.arms_recalculation_timer() {
            positive("recalculation_interval", self.recalculation_interval);
        }
        if self.mode == ControlMode::LowDensityExtend {
            positive("extension_window", self.extension_window);
        }
        positive("max_phase_duration", self.max_phase_duration);
        positive("min_phase_duration", self.min_phase_duration);
        positive("suppress_duration", self.suppress_duration);

        if self.near_stationary_speed.is_nan() || self.near_stationary_speed < 0.0 {
            errors.push(ConfigError::Negative {
                field: "near_stationary_speed",
                value: self.near_stationary_speed,
            });
        }

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::saveload::Encoder;

    #[test]
    fn defaults_are_valid_in_every_mode() {
        for mode in [
            ControlMode::Off,
            ControlMode::FixedTime,
            ControlMode::HighDensity,
            ControlMode::LowDensityExtend,
        ] {
            assert!(SignalConfig::with_mode(mode).validate().is_ok(), "{:?}", mode);
        }
    }

    #[test]
    fn reports_all_problems() {
        let c = SignalConfig {
            mode: ControlMode::HighDensity,
            recalculation_interval: 0.0,
            max_phase_duration: -1.0,
            near_stationary_speed: -0.5,
            ..Default::default()
        };
        let errs = c.validate().unwrap_err();
        assert_eq!(errs.0.len(), 3);
        assert!(errs.iter().any(|e| matches!(
            e,
            ConfigError::NonPositive {
                field: "recalculation_interval",
                ..
            }
        )));
    }

    #[test]
    fn mode_specific_fields() {
        let c = SignalConfig {
            mode: ControlMode::HighDensity,
            extension_window: 0.0,
            ..Default::default()
        };
        assert!(c.validate().is_ok());

        let c = SignalConfig {
            mode: ControlMode::LowDensityExtend,
            extension_window: 0.0,
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn partial_json_takes_defaults() {
        let c: SignalConfig =
            JSON::decode(br#"{"mode":"LowDensityExtend","extension_window":4.0}"#).unwrap();
        assert_eq!(c.mode, ControlMode::LowDensityExtend);
        assert_eq!(c.extension_window, 4.0);
        assert_eq!(c.min_phase_duration, 3.0);
        assert_eq!(c.near_stationary_speed, 0.01);
    }

    #[test]
    fn mode_from_cli_name() {
        assert_eq!("Fixed-Time".parse::<ControlMode>(), Ok(ControlMode::FixedTime));
        assert_eq!("low".parse::<ControlMode>(), Ok(ControlMode::LowDensityExtend));
        assert!("adaptive".parse::<ControlMode>().is_err());
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join("signals_config_roundtrip.json");
        let c = SignalConfig {
            max_phase_duration: 45.0,
            ..SignalConfig::with_mode(ControlMode::LowDensityExtend)
        };
        common::saveload::save::<common::saveload::JSONPretty, _>(&c, &path).unwrap();
        assert_eq!(SignalConfig::load(&path).unwrap(), c);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn invalid_file_reports_fields() {
        let path = std::env::temp_dir().join("signals_config_invalid.json");
        std::fs::write(&path, br#"{"mode":"HighDensity","recalculation_interval":0}"#).unwrap();
        match SignalConfig::load(&path) {
            Err(ControllerError::Config(errs)) => assert_eq!(errs.0.len(), 1),
            other => panic!("expected config errors, got {:?}", other),
        }
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(matches!(
            SignalConfig::load("does/not/exist.json"),
            Err(ControllerError::Load(_))
        ));
    }
}
