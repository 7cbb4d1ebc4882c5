//! Annual campus-card report: turns a year of raw card swipes into the
//! statistics behind a personalized dining report.
//!
//! The pipeline is a one-shot batch transform:
//! back-fill locations, resolve timestamps (UTC+8), keep dining purchases,
//! cluster them into meals, then compute every statistic group
//! independently and merge the groups into one [`ReportData`].

pub mod card_usage;
pub mod config;
pub mod error;
pub mod labels;
pub mod loader;
pub mod meals;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use config::ReportOptions;
pub use error::ReportError;
pub use types::{Meal, RawTransaction, ReportData, Transaction};

use chrono::{DateTime, FixedOffset, Utc};

/// Analyze with default options, stamping the report with the current time.
pub fn analyze(raw: &[RawTransaction]) -> Result<ReportData, ReportError> {
    let now = Utc::now().with_timezone(&util::local_offset());
    analyze_with(raw, &ReportOptions::default(), now)
}

/// Run the whole pipeline. `now` becomes `last_updated`, so a fixed clock
/// gives reproducible output.
///
/// Fails only when a raw timestamp cannot be parsed.
pub fn analyze_with(
    raw: &[RawTransaction],
    options: &ReportOptions,
    now: DateTime<FixedOffset>,
) -> Result<ReportData, ReportError> {
    tracing::info!(records = raw.len(), "starting analysis");

    let rows = loader::backfill_locations(raw);
    let records = loader::stamp_records(&rows)?;
    let transactions = loader::create_transactions(&records);
    let cleaned = loader::clean_transactions(&transactions, &options.dining_code);
    let meals = meals::construct_meals(&cleaned, options.meal_gap);

    let basic = reports::basic_stats(&cleaned, &meals);
    let meal_times = reports::meal_time_stats(&meals);
    let achievement_badges = reports::achievements(&meals, &basic, &meal_times);

    let report = ReportData {
        favorites: reports::favorites(&cleaned, &meals),
        cost: reports::cost_extremes(&meals),
        time_habits: reports::time_habits(&meals),
        holiday_meal: reports::holiday_first_meal(&meals, options.holiday_cutoff()),
        most_expensive: reports::most_expensive_meal(&meals),
        most_stalls: reports::most_stalls_meal(&meals),
        visits: reports::visit_stats(&cleaned),
        monthly: reports::monthly_trends(&meals),
        prices: reports::price_distribution(&meals),
        weekday_weekend_stats: reports::weekday_weekend(&meals),
        seasons: reports::seasonal_patterns(&meals),
        loyalty: reports::cafeteria_loyalty(&meals),
        basic,
        meal_times,
        achievement_badges,
        water_utilities_stats: card_usage::utility_usage(&records),
        balance_management_stats: card_usage::balance_management(&records),
        beyond_dining_stats: card_usage::beyond_dining(&records),
        campus_timeline_stats: card_usage::campus_timeline(&records),
        last_updated: now,
        raw_transactions: raw.to_vec(),
    };

    tracing::info!(
        total_yuan = %util::format_yuan(report.basic.total_amount),
        meals = report.basic.total_meals,
        "analysis complete"
    );
    Ok(report)
}
