use crate::labels::{serialize_label, BeyondCategory, Comparison, ManagementStyle, PriceTier, Season};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// One card swipe as delivered by the provider, field names as on the wire.
///
/// The provider sends `null` for fields it has no value for, so every plain
/// field reads a missing key and an explicit `null` alike as its default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Local timestamp without offset, e.g. `2025-03-01 12:04:31`.
    #[serde(rename = "txdate", default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    /// Cafeteria / location, `"-"` when the provider left it blank.
    #[serde(rename = "meraddr", default, deserialize_with = "null_as_default")]
    pub location: String,
    /// Stall / merchant, often `<cafeteria>_<stall>`.
    #[serde(rename = "mername", default, deserialize_with = "null_as_default")]
    pub merchant: String,
    /// Signed amount in cents.
    #[serde(rename = "txamt", default, deserialize_with = "null_as_default")]
    pub amount: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub balance: i64,
    #[serde(rename = "txcode", default, deserialize_with = "null_as_default")]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "txname", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawTransaction {
    pub fn summary(&self) -> &str {
        self.summary.as_deref().unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// A raw record with its timestamp resolved to UTC+8.
#[derive(Debug, Clone, Copy)]
pub struct CardRecord<'a> {
    pub at: DateTime<FixedOffset>,
    pub raw: &'a RawTransaction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: DateTime<FixedOffset>,
    pub cafeteria: String,
    pub stall: String,
    pub amount: i64,
    pub balance: i64,
    pub code: String,
}

/// Purchases at one cafeteria chained less than the meal gap apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    /// Time of the first purchase.
    pub date: DateTime<FixedOffset>,
    pub cafeteria: String,
    pub amount: i64,
    pub num_stalls: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicStats {
    pub total_amount: i64,
    pub total_meals: usize,
    pub num_unique_cafeterias: usize,
    pub num_unique_stalls: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CafeteriaSpend {
    pub cafeteria: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStats {
    pub most_visited_cafeteria: String,
    pub most_visited_cafeteria_count: usize,
    pub most_spent_cafeteria: String,
    pub most_spent_cafeteria_amount: i64,
    pub most_spent_stall: String,
    pub most_spent_stall_amount: i64,
    /// Every cafeteria by total spend, descending.
    pub cafeterias_spent: Vec<CafeteriaSpend>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostStats {
    pub most_costly_cafeteria: String,
    pub most_costly_cafeteria_cost: f64,
    pub most_cheap_cafeteria: String,
    pub most_cheap_cafeteria_cost: f64,
}

/// A minute-of-day bucket and how many meals started in it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeHabits {
    pub breakfast_most_frequent: ClockTime,
    pub lunch_most_frequent: ClockTime,
    pub dinner_most_frequent: ClockTime,
    pub earliest: DateTime<FixedOffset>,
    pub latest: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealRef {
    pub date: DateTime<FixedOffset>,
    pub cafeteria: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayMeal {
    pub new_year_first_meal: MealRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MostExpensiveMeal {
    pub most_expensive_meal_date: DateTime<FixedOffset>,
    pub most_expensive_meal_amount: i64,
    pub most_expensive_meal_cafeteria: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MostStallsMeal {
    pub most_num_stalls_meal_date: DateTime<FixedOffset>,
    pub most_num_stalls_meal_stalls: usize,
    pub most_num_stalls_cafeteria: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitStats {
    pub num_visited_dates: usize,
    /// First day of the longest stretch without any purchase.
    pub max_consecutive_no_record_date_begin: Option<NaiveDate>,
    pub max_consecutive_no_record_date_end: Option<NaiveDate>,
    pub max_consecutive_no_record_days: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySpending {
    pub month: u32,
    pub amount: i64,
    pub meal_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthAmount {
    pub month: u32,
    pub amount: i64,
}

impl Default for MonthAmount {
    fn default() -> Self {
        MonthAmount { month: 1, amount: 0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrends {
    /// Always twelve entries, January first.
    pub monthly_spending: Vec<MonthlySpending>,
    pub peak_month: MonthAmount,
    pub low_month: MonthAmount,
    pub monthly_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBucket {
    pub tier: PriceTier,
    pub range: &'static str,
    pub min: i64,
    /// Exclusive; `None` for the open top bucket.
    pub max: Option<i64>,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDistribution {
    pub price_distribution: Vec<PriceBucket>,
    #[serde(serialize_with = "serialize_label")]
    pub dominant_price_type: PriceTier,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayGroupStats {
    pub avg_cost: f64,
    pub meal_count: usize,
    pub top_cafeteria: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayWeekendStats {
    pub weekday: DayGroupStats,
    pub weekend: DayGroupStats,
    #[serde(serialize_with = "serialize_label")]
    pub comparison: Comparison,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalPattern {
    pub season: Season,
    pub avg_cost: f64,
    pub meal_count: usize,
    pub top_cafeteria: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalStats {
    pub seasonal_patterns: Vec<SeasonalPattern>,
    #[serde(serialize_with = "serialize_label")]
    pub best_season: Season,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CafeteriaLoyalty {
    pub cafeteria: String,
    pub total_days: usize,
    pub avg_monthly: f64,
    pub max_streak: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyStats {
    pub most_frequent_cafeteria: CafeteriaLoyalty,
    /// Top five by distinct visit days.
    pub cafeteria_loyalty_ranking: Vec<CafeteriaLoyalty>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealTimeStats {
    pub late_night_meals_count: usize,
    pub breakfast_days_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementBadge {
    pub id: &'static str,
    pub name: &'static str,
    pub emoji: &'static str,
    pub description: String,
    pub earned: bool,
    pub value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityStats {
    pub total_transactions: usize,
    pub total_amount: i64,
    pub avg_cost: f64,
    pub total_days: usize,
    pub most_frequent_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceStats {
    pub top_up_count: usize,
    pub total_top_up_amount: i64,
    pub starting_balance: i64,
    pub ending_balance: i64,
    pub lowest_balance: i64,
    #[serde(serialize_with = "serialize_label")]
    pub management_type: ManagementStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    #[serde(serialize_with = "serialize_label")]
    pub category: BeyondCategory,
    pub count: usize,
    pub amount: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeyondDiningStats {
    pub non_meal_transactions: usize,
    pub non_meal_amount: i64,
    /// In order of first appearance.
    pub categories: Vec<CategoryTotal>,
    pub most_unique_place: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    pub date: DateTime<FixedOffset>,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampusTimelineStats {
    pub first_transaction: TimelineEvent,
    pub last_transaction: TimelineEvent,
    pub longest_streak: usize,
    pub most_active_month: u32,
    pub total_active_days: usize,
}

/// Everything the report renderer needs, computed once per `analyze` call.
///
/// Groups are flattened when serialized, so the JSON form is one flat object
/// whose field names never collide.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    #[serde(flatten)]
    pub basic: BasicStats,
    #[serde(flatten)]
    pub favorites: FavoriteStats,
    #[serde(flatten)]
    pub cost: CostStats,
    #[serde(flatten)]
    pub time_habits: TimeHabits,
    #[serde(flatten)]
    pub holiday_meal: HolidayMeal,
    #[serde(flatten)]
    pub most_expensive: MostExpensiveMeal,
    #[serde(flatten)]
    pub most_stalls: MostStallsMeal,
    #[serde(flatten)]
    pub visits: VisitStats,
    #[serde(flatten)]
    pub monthly: MonthlyTrends,
    #[serde(flatten)]
    pub prices: PriceDistribution,
    pub weekday_weekend_stats: WeekdayWeekendStats,
    #[serde(flatten)]
    pub seasons: SeasonalStats,
    #[serde(flatten)]
    pub loyalty: LoyaltyStats,
    #[serde(flatten)]
    pub meal_times: MealTimeStats,
    pub achievement_badges: Vec<AchievementBadge>,
    pub water_utilities_stats: UtilityStats,
    pub balance_management_stats: BalanceStats,
    pub beyond_dining_stats: BeyondDiningStats,
    pub campus_timeline_stats: CampusTimelineStats,
    pub last_updated: DateTime<FixedOffset>,
    /// The input exactly as received, kept for the raw-data export.
    pub raw_transactions: Vec<RawTransaction>,
}
