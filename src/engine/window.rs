use crate::store::tracker::DEFAULT_DATE;
use chrono::{Duration, NaiveDate, Utc};
use tracing::warn;

/// Days from `date` (as `YYYYMMDD`, UTC midnight) through today, inclusive
/// of both boundary days. Zero or negative for future dates.
pub fn days_since_today(date: &str) -> i64 {
    let parsed = match NaiveDate::parse_from_str(date, "%Y%m%d") {
        Ok(parsed) => parsed,
        Err(_) => {
            // Over-scanning is harmless (dedup catches repeats); scanning
            // nothing would silently drop data.
            warn!(date, "unparseable last-log date, scanning from the epoch");
            NaiveDate::parse_from_str(DEFAULT_DATE, "%Y%m%d").unwrap_or_default()
        }
    };
    let midnight = parsed.and_hms_opt(0, 0, 0).unwrap_or_default();
    let delta = Utc::now().naive_utc() - midnight + Duration::days(1);
    delta.num_days()
}

/// The scan window: one formatted date per day from `last_date` through
/// today, oldest first.
pub fn date_list(last_date: &str, date_format: &str) -> Vec<String> {
    let days = days_since_today(last_date);
    let now = Utc::now();
    (0..days.max(0))
        .map(|offset| now - Duration::days(offset))
        .rev()
        .map(|date| date.format(date_format).to_string())
        .collect()
}
