/// Process exit codes - the only machine-readable output of `wifi_jumper`.
///
/// Kept at the process boundary; the detector itself returns `DetectionOutcome`.

use crate::detector::DetectionOutcome;

pub const EXIT_ABSENT: i32 = 0;
pub const EXIT_PRESENT: i32 = 1;
/// Hardware fault, unknown platform or bad configuration
pub const EXIT_FATAL: i32 = 2;
/// Platform has no physical GPIO
pub const EXIT_NOT_APPLICABLE: i32 = 99;

pub fn for_outcome(outcome: DetectionOutcome) -> i32 {
    match outcome {
        DetectionOutcome::Absent => EXIT_ABSENT,
        DetectionOutcome::Present | DetectionOutcome::PresentByDefault => EXIT_PRESENT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_codes() {
        assert_eq!(for_outcome(DetectionOutcome::Absent), 0);
        assert_eq!(for_outcome(DetectionOutcome::Present), 1);
        assert_eq!(for_outcome(DetectionOutcome::PresentByDefault), 1);
    }

    #[test]
    fn test_reserved_codes_are_distinct() {
        let codes = [EXIT_ABSENT, EXIT_PRESENT, EXIT_FATAL, EXIT_NOT_APPLICABLE];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
