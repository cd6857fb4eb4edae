//! Busy-wait CPU burn.

use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Outcome of a CPU burn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CpuBurn {
    /// Accumulated pseudo-random sum. Returned so the loop cannot be optimized away.
    pub result: f64,
    /// Measured wall-clock time spent spinning.
    pub elapsed_ms: u64,
}

/// Spins on the calling thread until `duration` of wall-clock time has passed.
///
/// Never yields. The clock is checked once per iteration, so the measured
/// time may overshoot `duration` slightly but never falls short of it.
pub fn burn(duration: Duration) -> CpuBurn {
    let mut rng = ChaCha8Rng::from_entropy();
    let start = Instant::now();
    let mut result = 0.0_f64;

    while start.elapsed() < duration {
        result += unit_f64(&mut rng).sqrt();
    }

    CpuBurn {
        result,
        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}

/// Uniform sample in `[0, 1)` using the top 53 bits of a `u64`.
fn unit_f64(rng: &mut impl RngCore) -> f64 {
    (rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_returns_early() {
        let outcome = burn(Duration::from_millis(30));
        assert!(outcome.elapsed_ms >= 30);
        assert!(outcome.result > 0.0);
    }

    #[test]
    fn test_zero_duration_returns_immediately() {
        let outcome = burn(Duration::ZERO);
        assert_eq!(outcome.result, 0.0);
    }

    #[test]
    fn test_unit_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1000 {
            let x = unit_f64(&mut rng);
            assert!((0.0..1.0).contains(&x));
        }
    }
}
