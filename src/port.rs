/// GPIO port abstraction consumed by the jumper detector.
///
/// Backends: `gpio::CdevPort` (Linux GPIO character device, `gpiod` feature)
/// and `sim::SimulatedPort` (scripted, used by tests and `--simulate`).

use anyhow::Result;
use std::fmt;

/// Binary signal level on a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bit {
    Low = 0,
    High = 1,
}

impl Bit {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_high(self) -> bool {
        self == Bit::High
    }
}

impl From<bool> for Bit {
    fn from(high: bool) -> Self {
        if high { Bit::High } else { Bit::Low }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Direction a pin is configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

/// Bit-level access to a set of GPIO pins.
///
/// Pin identifiers are line offsets as understood by the backend (BCM
/// numbering on a Raspberry Pi). Every method may fail with a hardware
/// fault; callers treat those as fatal.
pub trait GpioPort {
    fn configure(&mut self, pin: u32, mode: PinMode) -> Result<()>;
    fn write(&mut self, pin: u32, bit: Bit) -> Result<()>;
    fn read(&mut self, pin: u32) -> Result<Bit>;
    /// Release every pin this port has configured
    fn release_all(&mut self) -> Result<()>;
}

impl<P: GpioPort + ?Sized> GpioPort for &mut P {
    fn configure(&mut self, pin: u32, mode: PinMode) -> Result<()> {
        (**self).configure(pin, mode)
    }

    fn write(&mut self, pin: u32, bit: Bit) -> Result<()> {
        (**self).write(pin, bit)
    }

    fn read(&mut self, pin: u32) -> Result<Bit> {
        (**self).read(pin)
    }

    fn release_all(&mut self) -> Result<()> {
        (**self).release_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_display_and_conversion() {
        assert_eq!(Bit::High.to_string(), "1");
        assert_eq!(Bit::Low.to_string(), "0");
        assert_eq!(Bit::from(true), Bit::High);
        assert!(!Bit::from(false).is_high());
    }
}
