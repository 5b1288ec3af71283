/// GPIO character-device backend
///
/// Supports libgpiod-style access through `gpiocdev` (Linux only, `gpiod` feature).
/// Each configured pin holds its own line request; releasing drops them all.

use anyhow::{anyhow, Result};

use crate::port::{Bit, GpioPort, PinMode};

#[cfg(feature = "gpiod")]
use anyhow::Context;
#[cfg(feature = "gpiod")]
use gpiocdev::chip::Chip;
#[cfg(feature = "gpiod")]
use gpiocdev::line::Value;
#[cfg(feature = "gpiod")]
use gpiocdev::request::Request;
#[cfg(feature = "gpiod")]
use std::collections::HashMap;

#[cfg(feature = "gpiod")]
const CONSUMER: &str = "wifi_jumper";

/// GPIO port backed by `/dev/gpiochipN`
#[derive(Debug)]
pub struct CdevPort {
    chip_path: String,
    #[cfg(feature = "gpiod")]
    requests: HashMap<u32, Request>,
}

impl CdevPort {
    /// Open a chip for the given pins.
    /// With `chip = None`, the first gpiochip exposing every pin is used.
    #[cfg(feature = "gpiod")]
    pub fn open(chip: Option<&str>, pins: &[u32]) -> Result<Self> {
        let chip_path = match chip {
            Some(path) => path.to_string(),
            None => Self::find_gpio_chip(pins)?,
        };
        log::info!(target: "gpio", "Using {} for pins {:?}", chip_path, pins);
        Ok(Self {
            chip_path,
            requests: HashMap::new(),
        })
    }

    #[cfg(not(feature = "gpiod"))]
    pub fn open(_chip: Option<&str>, _pins: &[u32]) -> Result<Self> {
        Err(anyhow!("GPIO support not compiled in. Enable 'gpiod' feature."))
    }

    pub fn chip_path(&self) -> &str {
        &self.chip_path
    }

    /// Find a gpiochip that exposes all required pins
    #[cfg(feature = "gpiod")]
    fn find_gpio_chip(pins: &[u32]) -> Result<String> {
        use std::fs;

        let mut chip_paths: Vec<String> = fs::read_dir("/dev")
            .context("listing /dev for gpiochip devices")?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let path = entry.path();
                let name = path.file_name()?.to_str()?;
                if name.starts_with("gpiochip") {
                    Some(path.to_string_lossy().to_string())
                } else {
                    None
                }
            })
            .collect();

        chip_paths.sort();

        for chip_path in &chip_paths {
            if let Ok(chip) = Chip::from_path(chip_path) {
                if pins.iter().all(|pin| chip.line_info(*pin).is_ok()) {
                    return Ok(chip_path.clone());
                }
            }
        }

        Err(anyhow!("No gpiochip device exposes pins {:?} (searched {:?})", pins, chip_paths))
    }
}

#[cfg(feature = "gpiod")]
impl GpioPort for CdevPort {
    fn configure(&mut self, pin: u32, mode: PinMode) -> Result<()> {
        // A line can only be requested once; drop any previous request first
        self.requests.remove(&pin);

        let mut builder = Request::builder();
        builder.on_chip(&self.chip_path)
            .with_consumer(CONSUMER)
            .with_line(pin);
        match mode {
            PinMode::Input => builder.as_input(),
            PinMode::Output => builder.as_output(Value::Inactive),
        };
        let request = builder.request()
            .with_context(|| format!("requesting line {} on {} as {:?}", pin, self.chip_path, mode))?;

        self.requests.insert(pin, request);
        Ok(())
    }

    fn write(&mut self, pin: u32, bit: Bit) -> Result<()> {
        let request = self.requests.get(&pin)
            .ok_or_else(|| anyhow!("pin {} is not configured", pin))?;
        let value = if bit.is_high() { Value::Active } else { Value::Inactive };
        request.set_value(pin, value)?;
        Ok(())
    }

    fn read(&mut self, pin: u32) -> Result<Bit> {
        let request = self.requests.get(&pin)
            .ok_or_else(|| anyhow!("pin {} is not configured", pin))?;
        let value = request.value(pin)?;
        Ok(Bit::from(value == Value::Active))
    }

    fn release_all(&mut self) -> Result<()> {
        // Requests are released when dropped
        self.requests.clear();
        Ok(())
    }
}

#[cfg(not(feature = "gpiod"))]
impl GpioPort for CdevPort {
    fn configure(&mut self, _pin: u32, _mode: PinMode) -> Result<()> {
        Err(anyhow!("GPIO support not compiled in"))
    }

    fn write(&mut self, _pin: u32, _bit: Bit) -> Result<()> {
        Err(anyhow!("GPIO support not compiled in"))
    }

    fn read(&mut self, _pin: u32) -> Result<Bit> {
        Err(anyhow!("GPIO support not compiled in"))
    }

    fn release_all(&mut self) -> Result<()> {
        Ok(())
    }
}
