//! Transcoder progress parsing and translation.
//!
//! The transcoder's `-progress pipe:1` stream is a sequence of `key=value`
//! lines. The authoritative field is the elapsed output time; depending on
//! the build it arrives as `out_time_ms` (milliseconds or, on many builds,
//! microseconds under the same name), `out_time_us`, or the clock string
//! `out_time=HH:MM:SS.ffffff`. Parsing is kept as pure functions so the
//! unit heuristics can be pinned down with fixture tests.

/// One recognized elapsed-output-time field from a progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutTime {
    /// Numeric value from `out_time_ms`/`out_time_us`; unit is ambiguous,
    /// see [`normalize_out_time`].
    Raw(i64),
    /// Milliseconds parsed from an `out_time` clock string.
    Millis(u64),
}

/// Parse a single progress line into a recognized field.
///
/// Returns `None` for lines that carry no elapsed-output-time information
/// (`frame=`, `speed=`, `progress=`, malformed input, ...).
pub fn parse_progress_line(line: &str) -> Option<OutTime> {
    let (key, value) = line.split_once('=')?;
    match key.trim() {
        "out_time_ms" | "out_time_us" => value.trim().parse::<i64>().ok().map(OutTime::Raw),
        "out_time" => parse_clock_to_ms(value.trim()).map(OutTime::Millis),
        _ => None,
    }
}

/// Parse `HH:MM:SS.ffffff` into milliseconds.
fn parse_clock_to_ms(ts: &str) -> Option<u64> {
    let mut parts = ts.split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let total_secs = f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + seconds;
    Some((total_secs * 1000.0) as u64)
}

/// Decide the unit of a raw `out_time_ms`/`out_time_us` value.
///
/// Some transcoder builds report microseconds under the `out_time_ms` key.
/// A value strictly greater than `total_ms * 1000` is implausible as
/// milliseconds for this job and is treated as microseconds (divided by
/// 1000); a value at or below the threshold is taken as milliseconds.
/// Negative values (the transcoder emits `i64::MIN` before the first
/// frame) yield `None`.
pub fn normalize_out_time(raw: i64, total_ms: u64) -> Option<u64> {
    if raw < 0 {
        return None;
    }
    let raw = raw as u64;
    if raw > total_ms.saturating_mul(1000) {
        Some(raw / 1000)
    } else {
        Some(raw)
    }
}

/// Monotonic progress state for one export invocation.
///
/// Holds the expected total output duration and the last reported offset;
/// offsets that do not strictly advance are dropped, so the sink only ever
/// sees increasing values.
#[derive(Debug)]
pub struct ProgressTranslator {
    total_ms: u64,
    last_reported_ms: Option<u64>,
}

impl ProgressTranslator {
    /// Create a translator for a job expected to produce `total_ms` of
    /// output. A zero total is clamped to 1 so fractions stay defined.
    pub fn new(total_ms: u64) -> Self {
        Self {
            total_ms: total_ms.max(1),
            last_reported_ms: None,
        }
    }

    /// Feed one transcoder output line.
    ///
    /// Returns the normalized fraction to report, or `None` when the line
    /// carries nothing new. Reported values strictly advance in output
    /// milliseconds and are bounded to `[0, 1]`.
    pub fn observe_line(&mut self, line: &str) -> Option<f64> {
        let out_ms = match parse_progress_line(line)? {
            OutTime::Raw(raw) => normalize_out_time(raw, self.total_ms)?,
            OutTime::Millis(ms) => ms,
        };
        if self.last_reported_ms.is_some_and(|last| out_ms <= last) {
            return None;
        }
        self.last_reported_ms = Some(out_ms);
        Some((out_ms as f64 / self.total_ms as f64).clamp(0.0, 1.0))
    }

    /// Output offset last reported, if any.
    pub fn last_reported_ms(&self) -> Option<u64> {
        self.last_reported_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_unrelated_fields() {
        assert_eq!(parse_progress_line("frame=120"), None);
        assert_eq!(parse_progress_line("speed=1.19x"), None);
        assert_eq!(parse_progress_line("progress=continue"), None);
        assert_eq!(parse_progress_line("total_size=1048576"), None);
        assert_eq!(parse_progress_line("no equals sign here"), None);
    }

    #[test]
    fn parses_numeric_out_time_fields() {
        assert_eq!(parse_progress_line("out_time_ms=5000"), Some(OutTime::Raw(5000)));
        assert_eq!(
            parse_progress_line("out_time_us=5000000"),
            Some(OutTime::Raw(5_000_000))
        );
        assert_eq!(
            parse_progress_line("out_time_ms=-9223372036854775808"),
            Some(OutTime::Raw(i64::MIN))
        );
        assert_eq!(parse_progress_line("out_time_ms=garbage"), None);
    }

    #[test]
    fn parses_clock_out_time() {
        assert_eq!(
            parse_progress_line("out_time=00:00:12.345678"),
            Some(OutTime::Millis(12_345))
        );
        assert_eq!(
            parse_progress_line("out_time=01:02:03.500000"),
            Some(OutTime::Millis(3_723_500))
        );
        assert_eq!(parse_progress_line("out_time=12.5"), None);
        assert_eq!(parse_progress_line("out_time=aa:bb:cc"), None);
    }

    #[test]
    fn normalize_treats_threshold_as_milliseconds() {
        // 10 s job: 10_000_000 == total * 1000 sits exactly at the
        // threshold and stays milliseconds.
        assert_eq!(normalize_out_time(10_000_000, 10_000), Some(10_000_000));
        // One past the threshold flips to microseconds.
        assert_eq!(normalize_out_time(10_000_001, 10_000), Some(10_000));
    }

    #[test]
    fn normalize_divides_microsecond_values() {
        assert_eq!(normalize_out_time(30_500_000, 10_000), Some(30_500));
        assert_eq!(normalize_out_time(5_000, 10_000), Some(5_000));
    }

    #[test]
    fn normalize_rejects_negative_values() {
        assert_eq!(normalize_out_time(-1, 10_000), None);
        assert_eq!(normalize_out_time(i64::MIN, 10_000), None);
    }

    #[test]
    fn translator_is_monotonic_and_deduplicated() {
        let mut tr = ProgressTranslator::new(10_000);

        assert_eq!(tr.observe_line("out_time_ms=2000"), Some(0.2));
        // Same offset again: dropped.
        assert_eq!(tr.observe_line("out_time_ms=2000"), None);
        // Going backwards: dropped.
        assert_eq!(tr.observe_line("out_time_ms=1500"), None);
        assert_eq!(tr.observe_line("out_time_ms=5000"), Some(0.5));
        assert_eq!(tr.last_reported_ms(), Some(5_000));
    }

    #[test]
    fn translator_clamps_overshoot() {
        let mut tr = ProgressTranslator::new(10_000);
        assert_eq!(tr.observe_line("out_time_ms=10000"), Some(1.0));
    }

    #[test]
    fn translator_divides_out_of_range_microsecond_values() {
        let mut tr = ProgressTranslator::new(10_000);
        // Beyond total * 1000: read as microseconds and divided down, then
        // clamped since 12 s overshoots the 10 s job.
        assert_eq!(tr.observe_line("out_time_ms=12000000"), Some(1.0));
    }

    #[test]
    fn translator_accepts_clock_fallback() {
        let mut tr = ProgressTranslator::new(60_000);
        assert_eq!(tr.observe_line("out_time=00:00:30.000000"), Some(0.5));
    }

    #[test]
    fn translator_skips_initial_garbage() {
        let mut tr = ProgressTranslator::new(10_000);
        assert_eq!(tr.observe_line("out_time_ms=-9223372036854775808"), None);
        assert_eq!(tr.observe_line("out_time_ms=1000"), Some(0.1));
    }
}
