//! Tunables for one pipeline run.

use crate::util::{epoch, local_offset};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};

/// Transaction code the provider uses for a point-of-sale dining purchase.
pub const DINING_CODE: &str = "1210";

/// Purchases further apart than this belong to different meals.
pub const MEAL_GAP_MINUTES: i64 = 60;

/// Spring Festival 2025.
pub fn default_holiday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 29).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// The "first meal of the new year" is the first meal strictly after
    /// local midnight of this date.
    pub holiday: NaiveDate,
    pub dining_code: String,
    pub meal_gap: Duration,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            holiday: default_holiday(),
            dining_code: DINING_CODE.to_string(),
            meal_gap: Duration::minutes(MEAL_GAP_MINUTES),
        }
    }
}

impl ReportOptions {
    /// Local midnight at the start of the holiday.
    pub fn holiday_cutoff(&self) -> DateTime<FixedOffset> {
        let midnight = self.holiday.and_hms_opt(0, 0, 0).unwrap_or_default();
        local_offset()
            .from_local_datetime(&midnight)
            .single()
            .unwrap_or_else(epoch)
    }
}
