//! Human readable rendering of millisecond durations.

use std::fmt::Write as _;

/// Decomposition table, largest unit first. The trailing 1 ms entry keeps the
/// table exhaustive so every value decomposes with no remainder.
const UNITS: [(u64, &str); 5] = [
    (86_400_000, "day"),
    (3_600_000, "hour"),
    (60_000, "minute"),
    (1_000, "second"),
    (1, "millisecond"),
];

/// Render `millis` as a comma separated, largest-unit-first breakdown,
/// e.g. `1 minute, 30 seconds`.
///
/// Units with a zero magnitude are omitted, and unit names take a plural
/// `s` unless the magnitude is exactly 1. Zero renders as `0 milliseconds`.
#[must_use]
pub fn human_time(mut millis: u64) -> String {
    let mut out = String::new();

    for (size, name) in UNITS {
        let magnitude = millis / size;
        millis %= size;

        if magnitude == 0 {
            continue;
        }

        if !out.is_empty() {
            out.push_str(", ");
        }
        let _ = write!(out, "{magnitude} {name}");
        if magnitude != 1 {
            out.push('s');
        }
    }

    if out.is_empty() {
        out.push_str("0 milliseconds");
    }

    out
}
