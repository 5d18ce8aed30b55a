//! The periodic status line: elapsed and remaining time, completion
//! percentage, output sample count and total clips, debounced to one
//! update per 150 ms of wall clock.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

const DEBOUNCE: Duration = Duration::from_millis(150);

/// Formats a duration in seconds as `MM:SS.ss`.
pub fn format_time(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u64;
    format!("{:02}:{:05.2}", mins, seconds - mins as f64 * 60.0)
}

/// Renders a count with three significant figures and an SI suffix.
pub fn si_count(n: u64) -> String {
    const UNITS: [char; 7] = [' ', 'k', 'M', 'G', 'T', 'P', 'E'];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n}")
    } else if value >= 100.0 {
        format!("{:.0}{}", value, UNITS[unit])
    } else if value >= 10.0 {
        format!("{:.1}{}", value, UNITS[unit])
    } else {
        format!("{:.2}{}", value, UNITS[unit])
    }
}

/// Counters the reporter folds into one line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressSnapshot {
    /// Wide samples read from the current input so far.
    pub read_wide_samples: u64,
    /// Total wide samples expected from the current input; 0 when unknown.
    pub input_wide_samples: u64,
    /// Rate of the combined stream, for time conversion.
    pub rate: u32,
    /// Wide samples delivered to the output.
    pub output_samples: u64,
    /// Total clips across every counter in the session.
    pub clips: u64,
}

impl ProgressSnapshot {
    fn render(&self) -> String {
        let rate = self.rate.max(1) as f64;
        let read_time = self.read_wide_samples as f64 / rate;
        let (in_time, left_time, percentage) = if self.input_wide_samples > 0 {
            let in_time = self.input_wide_samples as f64 / rate;
            let left = (in_time - read_time).max(0.0);
            let pct = (100.0 * self.read_wide_samples as f64 / self.input_wide_samples as f64)
                .max(0.0);
            (in_time, left, pct)
        } else {
            (0.0, 0.0, 0.0)
        };
        format!(
            "Time: {} [{}] of {} ({:.1}%) Samples out: {} Clips: {}",
            format_time(read_time),
            format_time(left_time),
            format_time(in_time),
            percentage,
            si_count(self.output_samples),
            si_count(self.clips)
        )
    }
}

/// Debounced status-line reporter. A no-op when progress display is off.
pub struct ProgressReporter {
    enabled: bool,
    bar: Option<ProgressBar>,
    last: Instant,
}

impl ProgressReporter {
    /// Create a reporter; `enabled` gates all output.
    pub fn new(enabled: bool) -> Self {
        ProgressReporter {
            enabled,
            bar: None,
            // Let the first update draw immediately.
            last: Instant::now().checked_sub(DEBOUNCE).unwrap_or_else(Instant::now),
        }
    }

    fn bar(&mut self) -> &ProgressBar {
        self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(ProgressStyle::with_template("{msg}").unwrap());
            bar
        })
    }

    /// Redraw the status line if the debounce window has passed.
    pub fn update(&mut self, snapshot: ProgressSnapshot) {
        if !self.enabled {
            return;
        }
        if self.last.elapsed() < DEBOUNCE {
            return;
        }
        self.last = Instant::now();
        let line = snapshot.render();
        self.bar().set_message(line);
    }

    /// Draw a final line for the current input and move to a fresh row.
    pub fn finish(&mut self, snapshot: ProgressSnapshot) {
        if !self.enabled {
            return;
        }
        let line = snapshot.render();
        self.bar().finish_with_message(line);
        self.bar = None;
        self.last = Instant::now().checked_sub(DEBOUNCE).unwrap_or_else(Instant::now);
    }

    /// Print a standalone line without disturbing the status display.
    pub fn println(&mut self, message: &str) {
        if !self.enabled {
            return;
        }
        match &self.bar {
            Some(bar) => bar.println(message),
            None => eprintln!("{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_formatting() {
        assert_eq!(format_time(0.0), "00:00.00");
        assert_eq!(format_time(61.5), "01:01.50");
        assert_eq!(format_time(3.25), "00:03.25");
    }

    #[test]
    fn si_count_scales() {
        assert_eq!(si_count(0), "0");
        assert_eq!(si_count(999), "999");
        assert_eq!(si_count(1000), "1.00k");
        assert_eq!(si_count(12_345), "12.3k");
        assert_eq!(si_count(123_456), "123k");
        assert_eq!(si_count(1_234_567), "1.23M");
    }

    #[test]
    fn snapshot_renders_percentage() {
        let snap = ProgressSnapshot {
            read_wide_samples: 4410,
            input_wide_samples: 44100,
            rate: 44100,
            output_samples: 4410,
            clips: 0,
        };
        let line = snap.render();
        assert!(line.contains("10.0%"), "{line}");
        assert!(line.contains("Time: 00:00.10"), "{line}");
        assert!(line.contains("of 00:01.00"), "{line}");
    }

    #[test]
    fn unknown_length_renders_zero_remaining() {
        let snap = ProgressSnapshot {
            read_wide_samples: 100,
            input_wide_samples: 0,
            rate: 100,
            output_samples: 100,
            clips: 2,
        };
        let line = snap.render();
        assert!(line.contains("(0.0%)"), "{line}");
        assert!(line.contains("Clips: 2"), "{line}");
    }

    #[test]
    fn disabled_reporter_is_silent() {
        let mut reporter = ProgressReporter::new(false);
        reporter.update(ProgressSnapshot::default());
        reporter.finish(ProgressSnapshot::default());
        assert!(reporter.bar.is_none());
    }
}
