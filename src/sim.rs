/// Simulated GPIO port with scripted input responses.
///
/// Used by the test suite and by the `--simulate` CLI mode to run the real
/// detector without touching hardware. Reads are grouped into rounds of
/// `SEQUENCE_LEN` bits so scripts can be expressed per round.

use anyhow::{anyhow, Result};
use std::collections::HashMap;

use crate::detector::{Sequence, SEQUENCE_LEN};
use crate::port::{Bit, GpioPort, PinMode};
use Bit::{High, Low};

/// Patterns that never match the output sequence and are never all zero
const NOISE_PATTERNS: [Sequence; 3] = [
    [High, High, High, High, High],
    [Low, High, Low, Low, High],
    [High, Low, Low, High, Low],
];

/// What the input pin reports
#[derive(Debug, Clone)]
pub enum InputScript {
    /// Input follows the last bit written to any output pin (jumper fitted)
    Mirror,
    /// Input is stuck at one level
    Constant(Bit),
    /// One observed sequence per round, cycling when exhausted
    Rounds(Vec<Sequence>),
}

#[derive(Debug)]
pub struct SimulatedPort {
    script: InputScript,
    modes: HashMap<u32, PinMode>,
    last_written: Option<Bit>,
    fail_on_write: Option<usize>,
    fail_on_read: Option<usize>,
    configure_calls: usize,
    writes: usize,
    reads: usize,
    releases: usize,
}

impl SimulatedPort {
    pub fn new(script: InputScript) -> Self {
        Self {
            script,
            modes: HashMap::new(),
            last_written: None,
            fail_on_write: None,
            fail_on_read: None,
            configure_calls: 0,
            writes: 0,
            reads: 0,
            releases: 0,
        }
    }

    pub fn mirror() -> Self {
        Self::new(InputScript::Mirror)
    }

    pub fn constant(bit: Bit) -> Self {
        Self::new(InputScript::Constant(bit))
    }

    /// Intermittently coupled wire: every round is inconclusive
    pub fn noisy() -> Self {
        Self::new(InputScript::Rounds(NOISE_PATTERNS.to_vec()))
    }

    pub fn rounds(rounds: Vec<Sequence>) -> Self {
        Self::new(InputScript::Rounds(rounds))
    }

    /// Fail the `n`th write (1-based) with an I/O fault
    pub fn fail_on_write(mut self, n: usize) -> Self {
        self.fail_on_write = Some(n);
        self
    }

    /// Fail the `n`th read (1-based) with an I/O fault
    pub fn fail_on_read(mut self, n: usize) -> Self {
        self.fail_on_read = Some(n);
        self
    }

    pub fn configure_calls(&self) -> usize {
        self.configure_calls
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn releases(&self) -> usize {
        self.releases
    }

    pub fn is_configured(&self, pin: u32) -> bool {
        self.modes.contains_key(&pin)
    }

    fn require_mode(&self, pin: u32, mode: PinMode) -> Result<()> {
        match self.modes.get(&pin) {
            Some(m) if *m == mode => Ok(()),
            Some(m) => Err(anyhow!("pin {} is configured as {:?}, not {:?}", pin, m, mode)),
            None => Err(anyhow!("pin {} is not configured", pin)),
        }
    }

    fn scripted_bit(&self, read_index: usize) -> Bit {
        match &self.script {
            InputScript::Mirror => self.last_written.unwrap_or(Low),
            InputScript::Constant(bit) => *bit,
            InputScript::Rounds(rounds) if rounds.is_empty() => Low,
            InputScript::Rounds(rounds) => {
                let round = (read_index / SEQUENCE_LEN) % rounds.len();
                rounds[round][read_index % SEQUENCE_LEN]
            }
        }
    }
}

impl GpioPort for SimulatedPort {
    fn configure(&mut self, pin: u32, mode: PinMode) -> Result<()> {
        self.configure_calls += 1;
        self.modes.insert(pin, mode);
        Ok(())
    }

    fn write(&mut self, pin: u32, bit: Bit) -> Result<()> {
        self.writes += 1;
        if self.fail_on_write == Some(self.writes) {
            return Err(anyhow!("simulated I/O fault on write #{} (pin {})", self.writes, pin));
        }
        self.require_mode(pin, PinMode::Output)?;
        self.last_written = Some(bit);
        Ok(())
    }

    fn read(&mut self, pin: u32) -> Result<Bit> {
        let index = self.reads;
        self.reads += 1;
        if self.fail_on_read == Some(self.reads) {
            return Err(anyhow!("simulated I/O fault on read #{} (pin {})", self.reads, pin));
        }
        self.require_mode(pin, PinMode::Input)?;
        Ok(self.scripted_bit(index))
    }

    fn release_all(&mut self) -> Result<()> {
        self.releases += 1;
        self.modes.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_requires_output_mode() {
        let mut port = SimulatedPort::mirror();
        assert!(port.write(5, High).is_err());
        port.configure(5, PinMode::Input).unwrap();
        assert!(port.write(5, High).is_err());
        port.configure(5, PinMode::Output).unwrap();
        assert!(port.write(5, High).is_ok());
    }

    #[test]
    fn test_mirror_follows_last_write() {
        let mut port = SimulatedPort::mirror();
        port.configure(5, PinMode::Output).unwrap();
        port.configure(6, PinMode::Input).unwrap();
        assert_eq!(port.read(6).unwrap(), Low);
        port.write(5, High).unwrap();
        assert_eq!(port.read(6).unwrap(), High);
    }

    #[test]
    fn test_rounds_cycle() {
        let mut port = SimulatedPort::rounds(vec![[High; SEQUENCE_LEN], [Low; SEQUENCE_LEN]]);
        port.configure(6, PinMode::Input).unwrap();
        let observed: Vec<Bit> = (0..SEQUENCE_LEN * 3).map(|_| port.read(6).unwrap()).collect();
        assert!(observed[..5].iter().all(|b| *b == High));
        assert!(observed[5..10].iter().all(|b| *b == Low));
        assert!(observed[10..].iter().all(|b| *b == High));
    }

    #[test]
    fn test_fault_injection_and_release() {
        let mut port = SimulatedPort::constant(Low).fail_on_read(2);
        port.configure(6, PinMode::Input).unwrap();
        assert!(port.read(6).is_ok());
        assert!(port.read(6).is_err());
        port.release_all().unwrap();
        assert_eq!(port.releases(), 1);
        assert!(!port.is_configured(6));
    }
}
