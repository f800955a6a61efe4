//! Simulated transfer growth between announces.

use std::ops::RangeInclusive;

use rand::Rng;

/// Whole pieces of jitter added to every simulated growth step.
pub const JITTER_PIECES: RangeInclusive<u64> = 1..=9;

/// Next believable byte count after `elapsed_secs` at `speed` bytes/s.
///
/// A zero speed freezes the count. Otherwise the linear growth gets a
/// random jitter of one to nine pieces so consecutive reports are not
/// perfectly regular. A non-zero `upper_bound` caps the result; zero means
/// unbounded.
pub fn next_byte_count<R: Rng + ?Sized>(
    rng: &mut R,
    speed: u64,
    current: u64,
    piece_size: u64,
    elapsed_secs: u64,
    upper_bound: u64,
) -> u64 {
    if speed == 0 {
        return current;
    }

    let jitter = piece_size.saturating_mul(rng.random_range(JITTER_PIECES));
    let candidate = current
        .saturating_add(speed.saturating_mul(elapsed_secs))
        .saturating_add(jitter);

    if upper_bound != 0 && candidate > upper_bound {
        upper_bound
    } else {
        candidate
    }
}

/// Bytes still missing from a torrent of `total` bytes.
///
/// # Panics
///
/// Panics if `downloaded` exceeds `total`; callers bound downloaded first.
pub fn bytes_left(downloaded: u64, total: u64) -> u64 {
    assert!(
        downloaded <= total,
        "downloaded {downloaded} exceeds torrent size {total}"
    );
    total - downloaded
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_zero_speed_keeps_current() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(next_byte_count(&mut rng, 0, 12_345, 16_384, 1800, 0), 12_345);
        assert_eq!(next_byte_count(&mut rng, 0, 500, 10, 10, 1000), 500);
    }

    #[test]
    fn test_growth_includes_piece_jitter() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..100 {
            let next = next_byte_count(&mut rng, 100, 0, 10, 10, 0);
            assert!((1010..=1090).contains(&next), "unexpected {next}");
            assert_eq!(next % 10, 0);
        }
    }

    #[test]
    fn test_clamps_to_upper_bound() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        // 0 + 100 * 10 + jitter(10..=90) always exceeds 1000.
        assert_eq!(next_byte_count(&mut rng, 100, 0, 10, 10, 1000), 1000);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut first = ChaCha8Rng::seed_from_u64(7);
        let mut second = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(
                next_byte_count(&mut first, 1024, 0, 16_384, 60, 0),
                next_byte_count(&mut second, 1024, 0, 16_384, 60, 0)
            );
        }
    }

    #[test]
    fn test_bytes_left() {
        assert_eq!(bytes_left(0, 1000), 1000);
        assert_eq!(bytes_left(1000, 1000), 0);
    }

    #[test]
    #[should_panic(expected = "exceeds torrent size")]
    fn test_bytes_left_rejects_overshoot() {
        bytes_left(1001, 1000);
    }

    proptest! {
        #[test]
        fn bounded_growth_stays_within_bound(
            seed in any::<u64>(),
            speed in 1u64..10_000_000,
            piece in 1u64..4_194_304,
            elapsed in 0u64..7200,
            total in 1u64..u64::MAX / 4,
            start_fraction in 0.0f64..=1.0,
        ) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let current = ((total as f64) * start_fraction) as u64;
            let current = current.min(total);

            let next = next_byte_count(&mut rng, speed, current, piece, elapsed, total);
            prop_assert!(next <= total);
            prop_assert!(next >= current);
        }
    }
}
