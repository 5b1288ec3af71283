//! Boot-time WiFi jumper check.
//!
//! Exit code: 0 = jumper absent, 1 = jumper present (or assumed present after
//! an inconclusive timeout), 99 = no physical GPIO on this platform,
//! 2 = hardware fault or configuration error.
//!
//! Run with: cargo run --bin wifi_jumper --features gpiod

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use gethostname::gethostname;
use std::path::PathBuf;

use wifi_jumper::config_loader;
use wifi_jumper::detector::{DetectorConfig, JumperDetector};
use wifi_jumper::exit_code;
use wifi_jumper::gpio::CdevPort;
use wifi_jumper::platform::{self, HardwareBrand, PinResolution};
use wifi_jumper::port::{Bit, GpioPort};
use wifi_jumper::sim::SimulatedPort;

const DEFAULT_INPUT_PIN: u32 = 6;
const DEFAULT_OUTPUT_PIN: u32 = 5;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Simulation {
    /// Input mirrors the output (jumper fitted)
    Present,
    /// Input stuck low (no jumper)
    Absent,
    /// Every round inconclusive; runs until the timeout
    Noisy,
}

/// Detect the WiFi jumper via a GPIO loopback test
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to wifi_jumper.yaml (default: $WIFI_JUMPER_CONFIG, then the crate directory)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Give up and assume the jumper is present after this many seconds
    #[arg(long)]
    timeout: Option<f64>,
    /// Override the input pin
    #[arg(long)]
    input_pin: Option<u32>,
    /// Override the output pin
    #[arg(long)]
    output_pin: Option<u32>,
    /// gpiochip device to use (e.g. /dev/gpiochip0)
    #[arg(long)]
    chip: Option<String>,
    /// Run the detector against a simulated port instead of hardware
    #[arg(long, value_enum)]
    simulate: Option<Simulation>,
    /// Debug-level logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn detect_with<P: GpioPort>(config: DetectorConfig, port: P, timeout: f64) -> Result<i32> {
    log::info!(target: "wifi_jumper", "Testing jumper: output pin {} -> input pin {} (timeout {}s)",
               config.output_pin, config.input_pin, timeout);
    let mut detector = JumperDetector::new(config, port);
    let outcome = detector.detect(timeout)?;
    let code = exit_code::for_outcome(outcome);
    log::info!(target: "wifi_jumper", "Outcome {:?} (exit {})", outcome, code);
    Ok(code)
}

fn run(args: &Args) -> Result<i32> {
    let config = config_loader::load_config(args.config.as_deref())?;
    let timeout = args.timeout.unwrap_or_else(|| config.timeout_secs());
    let timing = config.timing();

    if let Some(simulation) = args.simulate {
        let pins = DetectorConfig::new(
            args.input_pin.unwrap_or(DEFAULT_INPUT_PIN),
            args.output_pin.unwrap_or(DEFAULT_OUTPUT_PIN),
        ).with_timing(timing);
        let port = match simulation {
            Simulation::Present => SimulatedPort::mirror(),
            Simulation::Absent => SimulatedPort::constant(Bit::Low),
            Simulation::Noisy => SimulatedPort::noisy(),
        };
        log::info!(target: "wifi_jumper", "Simulating {:?}, no hardware is touched", simulation);
        return detect_with(pins, port, timeout);
    }

    let brand = platform::detect_hardware()?;
    if brand == HardwareBrand::Virtual {
        log::info!(target: "wifi_jumper", "No physical GPIO on {} hardware, nothing to test", brand);
        return Ok(exit_code::EXIT_NOT_APPLICABLE);
    }

    let (input_pin, output_pin, chip) = match (args.input_pin, args.output_pin) {
        (Some(input_pin), Some(output_pin)) => (input_pin, output_pin, args.chip.clone()),
        _ => {
            let hostname = gethostname().to_string_lossy().to_string();
            let resolved = match platform::resolve_pins(brand, &config, &hostname)? {
                PinResolution::Pins(pins) => pins,
                PinResolution::NotApplicable => return Ok(exit_code::EXIT_NOT_APPLICABLE),
            };
            (
                args.input_pin.unwrap_or(resolved.input_pin),
                args.output_pin.unwrap_or(resolved.output_pin),
                args.chip.clone().or(resolved.chip),
            )
        }
    };

    if input_pin == output_pin {
        return Err(anyhow!("Input and output pin must differ (both {})", input_pin));
    }

    let port = CdevPort::open(chip.as_deref(), &[input_pin, output_pin])?;
    detect_with(DetectorConfig::new(input_pin, output_pin).with_timing(timing), port, timeout)
}

fn main() {
    // ROBOT_HARDWARE, WIFI_JUMPER_CONFIG and RUST_LOG may come from .env
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let code = match run(&args) {
        Ok(code) => code,
        Err(e) => {
            log::error!(target: "wifi_jumper", "{:#}", e);
            exit_code::EXIT_FATAL
        }
    };
    std::process::exit(code);
}
