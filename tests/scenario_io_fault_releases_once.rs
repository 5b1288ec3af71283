use std::time::Duration;

use wifi_jumper::detector::{DetectorConfig, DetectorTiming, JumperDetector};
use wifi_jumper::sim::SimulatedPort;

/// Hardware faults during detection.
///
/// Validates:
/// 1) A write fault propagates as an error instead of a default outcome.
/// 2) The port is released exactly once after the fault.
/// 3) The fault is not retried.

fn config() -> DetectorConfig {
    DetectorConfig::new(6, 5).with_timing(DetectorTiming {
        settle_delay: Duration::from_millis(1),
        retry_delay: Duration::from_millis(2),
    })
}

#[test]
fn write_fault_on_third_bit_propagates_and_releases_once() {
    let port = SimulatedPort::mirror().fail_on_write(3);
    let mut detector = JumperDetector::new(config(), port);

    let err = detector.detect(10.0).expect_err("fault must propagate");
    let message = format!("{:#}", err);

    // Third bit of [1, 0, 1, 1, 0] is 1
    assert!(message.contains("writing 1 to output pin 5"), "unexpected error: {}", message);
    assert!(message.contains("simulated I/O fault"), "unexpected error: {}", message);

    let port = detector.port();
    assert_eq!(port.releases(), 1, "release_all must be called exactly once");
    assert_eq!(port.writes(), 3, "no bit may be written after the fault");
    assert_eq!(port.reads(), 2);
    assert!(!port.is_configured(5));
    assert!(!port.is_configured(6));
}

#[test]
fn read_fault_in_later_round_is_not_retried() {
    // First round is inconclusive, the fault hits round two
    let port = SimulatedPort::noisy().fail_on_read(7);
    let mut detector = JumperDetector::new(config(), port);

    let err = detector.detect(10.0).expect_err("fault must propagate");

    assert!(format!("{:#}", err).contains("reading input pin 6"));
    assert_eq!(detector.port().reads(), 7);
    assert_eq!(detector.port().releases(), 1);
}

#[test]
fn misconfigured_pin_is_fatal() {
    // Output and input on the same line: the input configuration is overwritten
    let mut detector = JumperDetector::new(DetectorConfig::new(5, 5), SimulatedPort::mirror());

    assert!(detector.detect(10.0).is_err());
    assert_eq!(detector.port().releases(), 1);
}

#[test]
fn borrowed_port_is_released_on_fault() {
    let mut port = SimulatedPort::constant(wifi_jumper::Bit::Low).fail_on_read(1);
    {
        let mut detector = JumperDetector::new(config(), &mut port);
        assert!(detector.detect(10.0).is_err());
    }
    assert_eq!(port.releases(), 1);
    assert_eq!(port.writes(), 1);
}
