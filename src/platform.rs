/// Hardware variant detection and pin resolution.
///
/// Identifies the board this process runs on and turns the configured pin
/// table into the pin pair the detector needs.

use anyhow::{anyhow, Result};
use std::env;
use std::fmt;
use std::fs;

use crate::config_loader::JumperConfig;

pub const HARDWARE_ENV_VAR: &str = "ROBOT_HARDWARE";
const DEVICE_TREE_MODEL: &str = "/proc/device-tree/model";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareBrand {
    RaspberryPi,
    RaspberryPi64,
    JetsonNano,
    /// No physical GPIO (simulator, container, desktop)
    Virtual,
}

impl HardwareBrand {
    pub fn from_env_value(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "raspberry_pi" | "raspberrypi" => Ok(HardwareBrand::RaspberryPi),
            "raspberry_pi_64" | "raspberrypi64" => Ok(HardwareBrand::RaspberryPi64),
            "jetson_nano" | "jetsonnano" => Ok(HardwareBrand::JetsonNano),
            "virtual" => Ok(HardwareBrand::Virtual),
            other => Err(anyhow!("Undefined hardware '{}' in {}", other, HARDWARE_ENV_VAR)),
        }
    }

    /// Classify a device-tree model string. `arch` is the running CPU architecture.
    pub fn from_model(model: &str, arch: &str) -> Result<Self> {
        let model = model.trim_end_matches('\0').trim();
        if model.contains("Raspberry Pi") {
            if arch == "aarch64" {
                Ok(HardwareBrand::RaspberryPi64)
            } else {
                Ok(HardwareBrand::RaspberryPi)
            }
        } else if model.contains("Jetson") {
            Ok(HardwareBrand::JetsonNano)
        } else {
            Err(anyhow!("Undefined hardware: '{}'", model))
        }
    }
}

impl fmt::Display for HardwareBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HardwareBrand::RaspberryPi => "RaspberryPi",
            HardwareBrand::RaspberryPi64 => "RaspberryPi64",
            HardwareBrand::JetsonNano => "JetsonNano",
            HardwareBrand::Virtual => "Virtual",
        };
        write!(f, "{}", name)
    }
}

/// Detect the running hardware: `ROBOT_HARDWARE` first, then the device-tree model.
/// A machine without a device-tree model is treated as virtual.
pub fn detect_hardware() -> Result<HardwareBrand> {
    if let Ok(value) = env::var(HARDWARE_ENV_VAR) {
        if !value.trim().is_empty() {
            let brand = HardwareBrand::from_env_value(&value)?;
            log::info!(target: "platform", "Hardware {} (from {})", brand, HARDWARE_ENV_VAR);
            return Ok(brand);
        }
    }

    match fs::read_to_string(DEVICE_TREE_MODEL) {
        Ok(model) => {
            let brand = HardwareBrand::from_model(&model, env::consts::ARCH)?;
            log::info!(target: "platform", "Hardware {} (model '{}')", brand, model.trim_end_matches('\0'));
            Ok(brand)
        }
        Err(e) => {
            log::info!(target: "platform", "No device-tree model ({}), assuming virtual hardware", e);
            Ok(HardwareBrand::Virtual)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPins {
    pub input_pin: u32,
    pub output_pin: u32,
    pub chip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinResolution {
    Pins(ResolvedPins),
    /// Platform has no physical GPIO; the test does not apply
    NotApplicable,
}

fn require_pin(value: Option<i64>, key: &str, brand: HardwareBrand) -> Result<u32> {
    let value = value.ok_or_else(|| anyhow!("{} is missing for {}", key, brand))?;
    if value < 0 {
        return Err(anyhow!("{} is not configured for {} (got {})", key, brand, value));
    }
    u32::try_from(value).map_err(|_| anyhow!("{} out of range for {} (got {})", key, brand, value))
}

/// Resolve the input/output pin pair for `brand` (with `hostname` overrides)
pub fn resolve_pins(brand: HardwareBrand, config: &JumperConfig, hostname: &str) -> Result<PinResolution> {
    if brand == HardwareBrand::Virtual {
        return Ok(PinResolution::NotApplicable);
    }

    let block = config.pins_for(brand, hostname)
        .ok_or_else(|| anyhow!("No pin configuration for {} (host '{}')", brand, hostname))?;
    let input_pin = require_pin(block.GPIO_IN, "GPIO_IN", brand)?;
    let output_pin = require_pin(block.GPIO_OUT, "GPIO_OUT", brand)?;
    if input_pin == output_pin {
        return Err(anyhow!("GPIO_IN and GPIO_OUT must differ for {} (both {})", brand, input_pin));
    }

    Ok(PinResolution::Pins(ResolvedPins {
        input_pin,
        output_pin,
        chip: block.GPIO_CHIP,
    }))
}
