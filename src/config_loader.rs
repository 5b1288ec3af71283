use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{anyhow, Result};
use dotenvy::dotenv;

use crate::detector::{DetectorTiming, DEFAULT_TIMEOUT_SECS};
use crate::platform::HardwareBrand;

pub const CONFIG_FILE_NAME: &str = "wifi_jumper.yaml";
pub const CONFIG_ENV_VAR: &str = "WIFI_JUMPER_CONFIG";

/// Pin assignment for one hardware brand or host.
/// A negative pin number means "not configured".
#[allow(non_snake_case)]
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PinConfig {
    pub GPIO_IN: Option<i64>,
    pub GPIO_OUT: Option<i64>,
    pub GPIO_CHIP: Option<String>,
}

impl PinConfig {
    /// Fill unset fields from `base`
    fn or(&self, base: &PinConfig) -> PinConfig {
        PinConfig {
            GPIO_IN: self.GPIO_IN.or(base.GPIO_IN),
            GPIO_OUT: self.GPIO_OUT.or(base.GPIO_OUT),
            GPIO_CHIP: self.GPIO_CHIP.clone().or_else(|| base.GPIO_CHIP.clone()),
        }
    }
}

#[allow(non_snake_case)]
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct DetectionConfig {
    pub TIMEOUT_SECS: Option<f64>,
    pub SETTLE_MS: Option<u64>,
    pub RETRY_MS: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct JumperConfig {
    #[serde(rename = "RaspberryPi")]
    pub raspberry_pi: Option<PinConfig>,
    #[serde(rename = "RaspberryPi64")]
    pub raspberry_pi_64: Option<PinConfig>,
    #[serde(rename = "JetsonNano")]
    pub jetson_nano: Option<PinConfig>,
    /// hostname -> pin overrides
    pub hosts: Option<BTreeMap<String, PinConfig>>,
    #[serde(rename = "DETECTION")]
    pub detection: Option<DetectionConfig>,
}

impl JumperConfig {
    /// Pins used when no config file is present
    pub fn builtin() -> Self {
        Self {
            raspberry_pi: Some(PinConfig {
                GPIO_IN: Some(6),
                GPIO_OUT: Some(5),
                GPIO_CHIP: None,
            }),
            raspberry_pi_64: None,
            jetson_nano: Some(PinConfig {
                GPIO_IN: Some(-1),
                GPIO_OUT: Some(-1),
                GPIO_CHIP: None,
            }),
            hosts: None,
            detection: None,
        }
    }

    fn brand_block(&self, brand: HardwareBrand) -> Option<&PinConfig> {
        match brand {
            HardwareBrand::RaspberryPi => self.raspberry_pi.as_ref(),
            // 64-bit Pi shares the 32-bit header layout unless overridden
            HardwareBrand::RaspberryPi64 => self.raspberry_pi_64.as_ref().or(self.raspberry_pi.as_ref()),
            HardwareBrand::JetsonNano => self.jetson_nano.as_ref(),
            HardwareBrand::Virtual => None,
        }
    }

    /// Effective pin block for a brand, with any per-host override applied.
    /// Returns None if neither the brand nor the host has an entry.
    pub fn pins_for(&self, brand: HardwareBrand, hostname: &str) -> Option<PinConfig> {
        let brand_block = self.brand_block(brand);
        let host_block = self.hosts.as_ref().and_then(|m| m.get(hostname));
        match (host_block, brand_block) {
            (Some(host), Some(base)) => Some(host.or(base)),
            (Some(host), None) => Some(host.clone()),
            (None, Some(base)) => Some(base.clone()),
            (None, None) => None,
        }
    }

    pub fn timeout_secs(&self) -> f64 {
        self.detection.as_ref()
            .and_then(|d| d.TIMEOUT_SECS)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn timing(&self) -> DetectorTiming {
        let defaults = DetectorTiming::default();
        let Some(d) = self.detection.as_ref() else {
            return defaults;
        };
        DetectorTiming {
            settle_delay: d.SETTLE_MS.map(Duration::from_millis).unwrap_or(defaults.settle_delay),
            retry_delay: d.RETRY_MS.map(Duration::from_millis).unwrap_or(defaults.retry_delay),
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(t) = self.detection.as_ref().and_then(|d| d.TIMEOUT_SECS) {
            if !t.is_finite() || t < 0.0 {
                return Err(anyhow!("DETECTION.TIMEOUT_SECS must be a non-negative number (got {})", t));
            }
        }
        if let Some(0) = self.detection.as_ref().and_then(|d| d.SETTLE_MS) {
            return Err(anyhow!("DETECTION.SETTLE_MS must be greater than zero"));
        }
        Ok(())
    }
}

/// Default config location: `$WIFI_JUMPER_CONFIG`, else next to the crate manifest
pub fn default_config_path() -> PathBuf {
    // Ensure .env is loaded so WIFI_JUMPER_CONFIG / ROBOT_HARDWARE can come from it
    let _ = dotenv();
    match env::var(CONFIG_ENV_VAR) {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(CONFIG_FILE_NAME),
    }
}

pub fn load_config_from_str(yaml: &str) -> Result<JumperConfig> {
    let config: JumperConfig = serde_yaml::from_str(yaml)
        .map_err(|e| anyhow!("Invalid {}: {}", CONFIG_FILE_NAME, e))?;
    config.validate()?;
    Ok(config)
}

pub fn load_config_from_path(path: &Path) -> Result<JumperConfig> {
    let file = File::open(path)
        .map_err(|e| anyhow!("Missing required {} at {:?}: {}", CONFIG_FILE_NAME, path, e))?;
    let config: JumperConfig = serde_yaml::from_reader(file)
        .map_err(|e| anyhow!("Invalid config at {:?}: {}", path, e))?;
    config.validate()?;
    log::info!(target: "config_loader", "Loaded {:?}", path);
    Ok(config)
}

/// Load the jumper config.
///
/// An explicitly given path must exist. Without one, the default location is
/// tried and the built-in pin table is used if nothing is there.
pub fn load_config(explicit: Option<&Path>) -> Result<JumperConfig> {
    if let Some(path) = explicit {
        return load_config_from_path(path);
    }
    let path = default_config_path();
    if path.exists() {
        load_config_from_path(&path)
    } else {
        log::info!(target: "config_loader", "No config at {:?}, using built-in pin table", path);
        Ok(JumperConfig::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
RaspberryPi:
  GPIO_IN: 6
  GPIO_OUT: 5
JetsonNano:
  GPIO_IN: -1
  GPIO_OUT: -1
hosts:
  bench-pi:
    GPIO_IN: 17
DETECTION:
  TIMEOUT_SECS: 30
  SETTLE_MS: 250
"#;

    #[test]
    fn test_parse_sample() {
        let cfg = load_config_from_str(SAMPLE).unwrap();
        assert_eq!(cfg.raspberry_pi.as_ref().unwrap().GPIO_OUT, Some(5));
        assert_eq!(cfg.timeout_secs(), 30.0);
        let timing = cfg.timing();
        assert_eq!(timing.settle_delay, Duration::from_millis(250));
        assert_eq!(timing.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_host_override_merges_with_brand() {
        let cfg = load_config_from_str(SAMPLE).unwrap();
        let pins = cfg.pins_for(HardwareBrand::RaspberryPi, "bench-pi").unwrap();
        assert_eq!(pins.GPIO_IN, Some(17));
        assert_eq!(pins.GPIO_OUT, Some(5));

        let pins = cfg.pins_for(HardwareBrand::RaspberryPi, "other-host").unwrap();
        assert_eq!(pins.GPIO_IN, Some(6));
    }

    #[test]
    fn test_pi64_falls_back_to_pi() {
        let cfg = JumperConfig::builtin();
        assert_eq!(
            cfg.pins_for(HardwareBrand::RaspberryPi64, "any"),
            cfg.pins_for(HardwareBrand::RaspberryPi, "any"),
        );
    }

    #[test]
    fn test_builtin_defaults() {
        let cfg = JumperConfig::builtin();
        assert_eq!(cfg.timeout_secs(), 120.0);
        assert_eq!(cfg.timing(), DetectorTiming::default());
        assert!(cfg.pins_for(HardwareBrand::Virtual, "any").is_none());
    }

    #[test]
    fn test_rejects_negative_timeout() {
        let err = load_config_from_str("DETECTION:\n  TIMEOUT_SECS: -5\n").unwrap_err();
        assert!(err.to_string().contains("TIMEOUT_SECS"));
    }

    #[test]
    fn test_rejects_zero_settle() {
        assert!(load_config_from_str("DETECTION:\n  SETTLE_MS: 0\n").is_err());
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let err = load_config(Some(Path::new("/nonexistent/wifi_jumper.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Missing required"));
    }
}
