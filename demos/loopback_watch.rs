/// Standalone loopback watcher for wiring diagnosis.
///
/// Resolves pins like `wifi_jumper`, then runs test rounds forever and prints
/// each classification. Ctrl-C releases the pins and exits.
///
/// Run with: cargo run --example loopback_watch --features gpiod

use anyhow::{anyhow, Result};
use gethostname::gethostname;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use wifi_jumper::config_loader;
use wifi_jumper::detector::{DetectorConfig, JumperDetector, RoundResult};
use wifi_jumper::gpio::CdevPort;
use wifi_jumper::platform::{self, PinResolution};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("INFO: Loading host-specific jumper configuration...");
    let config = config_loader::load_config(None)?;
    let brand = platform::detect_hardware()?;
    let hostname = gethostname().to_string_lossy().to_string();

    let pins = match platform::resolve_pins(brand, &config, &hostname)? {
        PinResolution::Pins(pins) => pins,
        PinResolution::NotApplicable => {
            println!("No physical GPIO on {} hardware. Exiting.", brand);
            return Ok(());
        }
    };

    let port = CdevPort::open(pins.chip.as_deref(), &[pins.input_pin, pins.output_pin])?;
    println!("Using {} (out {} -> in {})", port.chip_path(), pins.output_pin, pins.input_pin);

    let detector_config = DetectorConfig::new(pins.input_pin, pins.output_pin).with_timing(config.timing());
    let mut detector = JumperDetector::new(detector_config, port);
    detector.configure_pins()?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || { r.store(false, Ordering::SeqCst); })
        .map_err(|e| anyhow!("Failed to install Ctrl-C handler: {}", e))?;

    let (mut present, mut absent, mut inconclusive) = (0u32, 0u32, 0u32);
    while running.load(Ordering::SeqCst) {
        match detector.run_round() {
            Ok(RoundResult::Present) => present += 1,
            Ok(RoundResult::Absent) => absent += 1,
            Ok(RoundResult::Inconclusive) => inconclusive += 1,
            Err(e) => {
                println!("Round error: {:#}", e);
                break;
            }
        }
        println!("present={} absent={} inconclusive={}", present, absent, inconclusive);
        println!("{}", "-".repeat(22));
        thread::sleep(Duration::from_secs(1));
    }

    detector.release()?;
    println!("GPIO resources released.");
    Ok(())
}
