//! Parser for .NET `TimeSpan` strings as reported by RavenDB
//! (`[d.]hh:mm:ss[.fffffff]`).

use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::debug;

const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_HOUR: f64 = 3_600.0;
const SECONDS_PER_MINUTE: f64 = 60.0;
/// The fraction is always seven digits (100ns ticks).
const TICKS_PER_SECOND: f64 = 10_000_000.0;

/// Convert a `TimeSpan` string into seconds.
///
/// Only the first match in `text` is used. Components that are not present
/// contribute zero.
///
/// Text that does not match the format at all is not an error: the result
/// falls back to `0.0` and the miss is traced at debug level.
///
/// # Panics
///
/// Panics if the regex cannot be compiled (should never happen).
#[must_use]
pub fn parse_timespan(text: &str) -> f64 {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(
            r"((?P<days>\d+)\.)?(?P<hours>\d{2}):(?P<minutes>\d{2}):(?P<seconds>\d{2})(\.(?P<fraction>\d{7}))?",
        )
        .expect("Invalid regex")
    });

    let Some(caps) = re.captures(text) else {
        debug!(value = text, "unrecognised timespan, falling back to zero");
        return 0.0;
    };

    let component = |name: &str| {
        caps.name(name)
            .map_or(0.0, |m| m.as_str().parse::<f64>().unwrap_or(0.0))
    };

    component("days") * SECONDS_PER_DAY
        + component("hours") * SECONDS_PER_HOUR
        + component("minutes") * SECONDS_PER_MINUTE
        + component("seconds")
        + component("fraction") / TICKS_PER_SECOND
}
