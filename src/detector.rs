/// Jumper detector - loopback sequence test between one output and one input pin.
///
/// A round writes the fixed output sequence one bit at a time, waits for the
/// line to settle and samples the input pin after each bit. Rounds repeat
/// until one is conclusive or the timeout expires; an expired timeout is
/// treated as "jumper present".

use anyhow::{anyhow, Context, Result};
use std::thread;
use std::time::{Duration, Instant};

use crate::port::{Bit, GpioPort, PinMode};
use Bit::{High, Low};

pub const SEQUENCE_LEN: usize = 5;

pub type Sequence = [Bit; SEQUENCE_LEN];

/// Bits driven onto the output pin, in order
pub const OUTPUT_SEQUENCE: Sequence = [High, Low, High, High, Low];

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_TIMEOUT_SECS: f64 = 120.0;

/// Classification of a single round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundResult {
    Present,
    Absent,
    Inconclusive,
}

/// Final answer of `JumperDetector::detect`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionOutcome {
    Present,
    Absent,
    /// No conclusive round before the timeout
    PresentByDefault,
}

impl DetectionOutcome {
    pub fn jumper_present(self) -> bool {
        !matches!(self, DetectionOutcome::Absent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorTiming {
    /// Wait between writing a bit and sampling the input
    pub settle_delay: Duration,
    /// Wait after an inconclusive round
    pub retry_delay: Duration,
}

impl Default for DetectorTiming {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl DetectorTiming {
    /// Wall-clock time of one round
    pub fn round_duration(&self) -> Duration {
        self.settle_delay * SEQUENCE_LEN as u32
    }
}

/// Already-resolved pin pair plus timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorConfig {
    pub input_pin: u32,
    pub output_pin: u32,
    pub timing: DetectorTiming,
}

impl DetectorConfig {
    pub fn new(input_pin: u32, output_pin: u32) -> Self {
        Self {
            input_pin,
            output_pin,
            timing: DetectorTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: DetectorTiming) -> Self {
        self.timing = timing;
        self
    }
}

/// Compare an observed input sequence against the expected output sequence
pub fn classify(expected: &Sequence, observed: &Sequence) -> RoundResult {
    if observed == expected {
        RoundResult::Present
    } else if observed.iter().all(|b| *b == Low) {
        RoundResult::Absent
    } else {
        RoundResult::Inconclusive
    }
}

pub fn format_sequence(seq: &Sequence) -> String {
    let bits: Vec<String> = seq.iter().map(|b| b.to_string()).collect();
    format!("[{}]", bits.join(", "))
}

/// Configures both pins on creation and releases the port when dropped,
/// whichever way `detect` exits.
struct PortSession<'a, P: GpioPort> {
    port: &'a mut P,
}

impl<'a, P: GpioPort> PortSession<'a, P> {
    fn open(port: &'a mut P, config: &DetectorConfig) -> Result<Self> {
        let session = Self { port };
        configure_pins(&mut *session.port, config)?;
        Ok(session)
    }
}

impl<P: GpioPort> Drop for PortSession<'_, P> {
    fn drop(&mut self) {
        match self.port.release_all() {
            Ok(()) => log::debug!(target: "detector", "GPIO pins released"),
            Err(e) => log::warn!(target: "detector", "Failed to release GPIO pins: {:#}", e),
        }
    }
}

fn configure_pins<P: GpioPort>(port: &mut P, config: &DetectorConfig) -> Result<()> {
    port.configure(config.input_pin, PinMode::Input)
        .with_context(|| format!("configuring input pin {}", config.input_pin))?;
    port.configure(config.output_pin, PinMode::Output)
        .with_context(|| format!("configuring output pin {}", config.output_pin))?;
    Ok(())
}

fn run_round_on<P: GpioPort>(port: &mut P, config: &DetectorConfig) -> Result<RoundResult> {
    let mut observed = [Low; SEQUENCE_LEN];
    for (slot, bit) in observed.iter_mut().zip(OUTPUT_SEQUENCE) {
        port.write(config.output_pin, bit)
            .with_context(|| format!("writing {} to output pin {}", bit, config.output_pin))?;
        thread::sleep(config.timing.settle_delay);
        *slot = port.read(config.input_pin)
            .with_context(|| format!("reading input pin {}", config.input_pin))?;
    }

    log::info!(target: "detector", "Sequence {} -> {}",
               format_sequence(&OUTPUT_SEQUENCE), format_sequence(&observed));

    let result = classify(&OUTPUT_SEQUENCE, &observed);
    if result == RoundResult::Inconclusive {
        log::warn!(target: "detector", "> Inconclusive test");
    }
    Ok(result)
}

/// Loopback jumper detector owning its GPIO port
#[derive(Debug)]
pub struct JumperDetector<P: GpioPort> {
    config: DetectorConfig,
    port: P,
}

impl<P: GpioPort> JumperDetector<P> {
    pub fn new(config: DetectorConfig, port: P) -> Self {
        Self { config, port }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn into_port(self) -> P {
        self.port
    }

    /// Configure the input and output pins without running a test.
    /// `detect` does this itself; only needed before calling `run_round` directly.
    pub fn configure_pins(&mut self) -> Result<()> {
        configure_pins(&mut self.port, &self.config)
    }

    /// Release all pins on the port
    pub fn release(&mut self) -> Result<()> {
        self.port.release_all()
    }

    /// Run one round of the loopback test. Pins must already be configured.
    /// Leaves the output pin at the last bit of the sequence.
    pub fn run_round(&mut self) -> Result<RoundResult> {
        run_round_on(&mut self.port, &self.config)
    }

    /// Repeat rounds until one is conclusive or `timeout_seconds` elapse.
    ///
    /// Pins are configured on entry and released on every exit, including
    /// when a round fails with an I/O fault. Faults are not retried.
    pub fn detect(&mut self, timeout_seconds: f64) -> Result<DetectionOutcome> {
        if timeout_seconds < 0.0 {
            return Err(anyhow!("Detection timeout must not be negative (got {})", timeout_seconds));
        }
        let timeout = Duration::try_from_secs_f64(timeout_seconds)
            .map_err(|e| anyhow!("Invalid detection timeout {}: {}", timeout_seconds, e))?;

        let config = self.config;
        let start = Instant::now();
        let session = PortSession::open(&mut self.port, &config)?;
        let mut rounds = 0u32;

        while start.elapsed() < timeout {
            rounds += 1;
            match run_round_on(&mut *session.port, &config)? {
                RoundResult::Present => {
                    log::info!(target: "detector", "Jumper detected after {} round(s)", rounds);
                    return Ok(DetectionOutcome::Present);
                }
                RoundResult::Absent => {
                    log::info!(target: "detector", "Jumper not detected after {} round(s)", rounds);
                    return Ok(DetectionOutcome::Absent);
                }
                RoundResult::Inconclusive => {
                    let remaining = timeout.saturating_sub(start.elapsed());
                    if remaining.is_zero() {
                        break;
                    }
                    thread::sleep(config.timing.retry_delay.min(remaining));
                }
            }
        }

        log::warn!(target: "detector",
                   "The test was inconclusive for {}s ({} round(s)), assuming jumper is present",
                   timeout_seconds, rounds);
        Ok(DetectionOutcome::PresentByDefault)
    }
}
