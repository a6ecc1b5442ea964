//! Volume indicator implementations
//!
//! - Average volume over a trailing window
//! - Volume ratio (latest volume relative to its trailing average)

/// Mean of the last `period` volumes, `None` when fewer are available.
pub fn average_volume(volumes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || volumes.len() < period {
        return None;
    }
    let window = &volumes[volumes.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Latest volume divided by the trailing `period` average.
///
/// A zero average reads 0 rather than dividing by zero.
pub fn volume_ratio(volumes: &[f64], period: usize) -> Option<f64> {
    let average = average_volume(volumes, period)?;
    let latest = *volumes.last()?;
    if average <= 0.0 {
        return Some(0.0);
    }
    Some(latest / average)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_average_volume() {
        let volumes = [100.0, 200.0, 300.0, 400.0];
        assert_relative_eq!(average_volume(&volumes, 2).unwrap(), 350.0);
        assert_eq!(average_volume(&volumes, 5), None);
        assert_eq!(average_volume(&volumes, 0), None);
    }

    #[test]
    fn test_volume_ratio_spike() {
        let mut volumes = vec![1000.0; 19];
        volumes.push(3000.0);
        // average = (19 * 1000 + 3000) / 20 = 1100
        assert_relative_eq!(volume_ratio(&volumes, 20).unwrap(), 3000.0 / 1100.0);
    }

    #[test]
    fn test_zero_average_volume_reads_zero() {
        assert_eq!(volume_ratio(&[0.0; 20], 20), Some(0.0));
    }
}
