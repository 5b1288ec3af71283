/// WiFi jumper detection library
///
/// GPIO loopback test deciding whether a jumper bridges an output pin to an
/// input pin, plus the platform and configuration glue around it.

pub mod config_loader;
pub mod detector;
pub mod exit_code;
pub mod gpio;
pub mod platform;
pub mod port;
pub mod sim;

pub use detector::{DetectionOutcome, DetectorConfig, DetectorTiming, JumperDetector, RoundResult};
pub use port::{Bit, GpioPort, PinMode};
