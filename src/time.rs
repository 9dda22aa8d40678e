//! Julian Day helpers built on `hifitime`.
//!
//! Valid observations carry a Julian Day together with a human-readable calendar date.
//! Conversions here treat the JD as UTC; the heliocentric/barycentric flavour of the
//! number is tracked separately by the retrievers and does not affect the calendar
//! rendering (the difference is at most a few minutes).
use hifitime::Epoch;

use crate::constants::JulianDay;

/// Offset between Julian Day and Modified Julian Day.
const JD_TO_MJD: f64 = 2_400_000.5;

/// Render a Julian Day as a UTC Gregorian date with fractional day.
///
/// Arguments
/// -----------------
/// * `jd`: Julian Day.
///
/// Return
/// ----------
/// * A string formatted as `YYYY-MM-DD.ddddd`, e.g. `2458849.5 → "2020-01-01.00000"`.
pub fn jd_to_calendar_date(jd: JulianDay) -> String {
    let (year, month, day, hour, minute, second, nanos) = Epoch::from_jde_utc(jd).to_gregorian_utc();

    let seconds_of_day = f64::from(hour) * 3600.0
        + f64::from(minute) * 60.0
        + f64::from(second)
        + f64::from(nanos) * 1e-9;
    let fraction = seconds_of_day / 86_400.0;

    // Avoid the "32.00000" artefact when the fraction rounds up.
    let fraction_digits = format!("{fraction:.5}");
    let fraction_digits = fraction_digits.trim_start_matches('0');
    if fraction_digits.starts_with("1.") {
        return format!("{year:04}-{month:02}-{day:02}.99999");
    }

    format!("{year:04}-{month:02}-{day:02}{fraction_digits}")
}

/// Julian Day → Modified Julian Day.
#[inline]
pub fn jd_to_mjd(jd: JulianDay) -> f64 {
    jd - JD_TO_MJD
}

/// Modified Julian Day → Julian Day.
#[inline]
pub fn mjd_to_jd(mjd: f64) -> JulianDay {
    mjd + JD_TO_MJD
}

/// Julian Day → hifitime [`Epoch`] (UTC).
#[inline]
pub fn jd_to_epoch(jd: JulianDay) -> Epoch {
    Epoch::from_jde_utc(jd)
}
