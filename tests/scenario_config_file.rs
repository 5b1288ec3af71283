use std::io::Write;

use wifi_jumper::config_loader::load_config;
use wifi_jumper::platform::{resolve_pins, HardwareBrand, PinResolution, ResolvedPins};

/// Loading wifi_jumper.yaml from disk and resolving pins per platform.

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn host_override_and_chip_are_resolved() {
    let file = write_config(
        r#"
RaspberryPi64:
  GPIO_IN: 6
  GPIO_OUT: 5
  GPIO_CHIP: /dev/gpiochip0
hosts:
  workshop-bot:
    GPIO_OUT: 26
DETECTION:
  TIMEOUT_SECS: 45.5
  RETRY_MS: 250
"#,
    );

    let config = load_config(Some(file.path())).expect("config load must succeed");
    assert_eq!(config.timeout_secs(), 45.5);
    assert_eq!(config.timing().retry_delay.as_millis(), 250);
    assert_eq!(config.timing().settle_delay.as_millis(), 500);

    let resolved = resolve_pins(HardwareBrand::RaspberryPi64, &config, "workshop-bot").unwrap();
    assert_eq!(
        resolved,
        PinResolution::Pins(ResolvedPins {
            input_pin: 6,
            output_pin: 26,
            chip: Some("/dev/gpiochip0".to_string()),
        })
    );
}

#[test]
fn virtual_platform_never_needs_pins() {
    let file = write_config("RaspberryPi:\n  GPIO_IN: 6\n  GPIO_OUT: 5\n");
    let config = load_config(Some(file.path())).unwrap();

    assert_eq!(
        resolve_pins(HardwareBrand::Virtual, &config, "anything").unwrap(),
        PinResolution::NotApplicable
    );
}

#[test]
fn malformed_yaml_is_rejected() {
    let file = write_config("RaspberryPi:\n  GPIO_IN: [not, a, pin]\n");
    assert!(load_config(Some(file.path())).is_err());
}
