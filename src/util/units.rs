//! Units formatting utilities
//!
//! Provides functions for human-readable rendering of throughput,
//! sample counts, and timing values in event output.

use std::time::Duration;

/// Format an operations-per-second rate the way benchmark reports
/// traditionally do: two decimals below 100 ops/sec, grouped integers above.
///
/// # Examples
/// ```
/// use benchrelay::util::units::format_hz;
///
/// assert_eq!(format_hz(12345.6), "12,346");
/// assert_eq!(format_hz(42.1234), "42.12");
/// assert_eq!(format_hz(0.0), "0");
/// ```
pub fn format_hz(hz: f64) -> String {
    if !hz.is_finite() || hz <= 0.0 {
        return "0".to_string();
    }

    if hz < 100.0 {
        format!("{:.2}", hz)
    } else {
        format_count(hz.round() as u64)
    }
}

/// Format an integer with thousands separators.
///
/// # Examples
/// ```
/// use benchrelay::util::units::format_count;
///
/// assert_eq!(format_count(987), "987");
/// assert_eq!(format_count(1234567), "1,234,567");
/// ```
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

/// Format a per-iteration period with precision matched to its magnitude.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use benchrelay::util::units::format_period;
///
/// assert_eq!(format_period(Duration::from_nanos(420)), "420ns");
/// assert_eq!(format_period(Duration::from_micros(1500)), "1.50ms");
/// ```
pub fn format_period(period: Duration) -> String {
    let nanos = period.as_nanos();

    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}μs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", period.as_secs_f64())
    }
}

/// Format a wall-clock duration into a human-readable string.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use benchrelay::util::units::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 3600 {
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if total_secs >= 60 {
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;
        format!("{}m {}s", minutes, seconds)
    } else if total_secs > 0 {
        if millis > 0 {
            format!("{}.{:02}s", total_secs, millis / 10)
        } else {
            format!("{}s", total_secs)
        }
    } else {
        format!("{}ms", millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_hz() {
        assert_eq!(format_hz(0.0), "0");
        assert_eq!(format_hz(f64::NAN), "0");
        assert_eq!(format_hz(-5.0), "0");
        assert_eq!(format_hz(3.14159), "3.14");
        assert_eq!(format_hz(99.999), "100.00");
        assert_eq!(format_hz(100.4), "100");
        assert_eq!(format_hz(1_500.0), "1,500");
        assert_eq!(format_hz(12_345_678.9), "12,345,679");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(10_000), "10,000");
        assert_eq!(format_count(100_000), "100,000");
        assert_eq!(format_count(1_234_567_890), "1,234,567,890");
    }

    #[test]
    fn test_format_period() {
        assert_eq!(format_period(Duration::from_nanos(1)), "1ns");
        assert_eq!(format_period(Duration::from_nanos(999)), "999ns");
        assert_eq!(format_period(Duration::from_micros(50)), "50.00μs");
        assert_eq!(format_period(Duration::from_micros(1500)), "1.50ms");
        assert_eq!(format_period(Duration::from_millis(250)), "250.00ms");
        assert_eq!(format_period(Duration::from_secs(2)), "2.00s");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }
}
