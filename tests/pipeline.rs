use card_report::labels::{Comparison, ManagementStyle, PriceTier, Season};
use card_report::loader::{backfill_locations, clean_transactions, create_transactions, stamp_records};
use card_report::meals::construct_meals;
use card_report::util::epoch;
use card_report::{analyze, analyze_with, RawTransaction, ReportError, ReportOptions};
use chrono::{DateTime, Duration, FixedOffset};

fn raw(ts: &str, location: &str, merchant: &str, amount: i64, code: &str) -> RawTransaction {
    RawTransaction {
        timestamp: ts.to_string(),
        location: location.to_string(),
        merchant: merchant.to_string(),
        amount,
        balance: 20_000,
        code: code.to_string(),
        summary: Some("持卡人消费".to_string()),
        name: None,
    }
}

fn frozen_clock() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2026-01-01T00:00:00+08:00").unwrap()
}

/// A small but varied year: two cafeterias, a stall hop, a shower, a top-up.
fn sample_year() -> Vec<RawTransaction> {
    let mut shower = raw("2025-03-03 21:15:00", "西区浴室", "西区_淋浴", 250, "1210");
    shower.summary = Some("水控POS消费流水".to_string());
    let mut top_up = raw("2025-03-04 09:00:00", "银行", "圈存机", 20_000, "1110");
    top_up.summary = Some("中行圈存".to_string());
    vec![
        raw("2025-03-04 12:40:00", "清芬园", "清芬园_面食", 1800, "1210"),
        raw("2025-03-01 07:30:00", "桃李园", "桃李园_自选", 600, "1210"),
        raw("2025-03-01 12:00:00", "桃李园", "桃李园_面食", 500, "1210"),
        raw("2025-03-01 12:30:00", "桃李园", "桃李园_饮品", 800, "1210"),
        raw("2025-03-02 18:10:00", "-", "桃李园_烤肉", 2600, "1210"),
        raw("2025-03-02 20:30:00", "-", "", 999, "1210"),
        shower,
        top_up,
        raw("2025-07-15 12:00:00", "清芬园", "清芬园_套餐", 3500, "1210"),
        raw("2025-07-15 15:00:00", "紫荆", "紫荆_冷饮", 450, "1220"),
    ]
}

fn meals_for(rows: &[RawTransaction]) -> (i64, Vec<card_report::Meal>) {
    let filled = backfill_locations(rows);
    let records = stamp_records(&filled).unwrap();
    let txns = create_transactions(&records);
    let cleaned = clean_transactions(&txns, "1210");
    let total = cleaned.iter().map(|t| t.amount).sum();
    (total, construct_meals(&cleaned, Duration::minutes(60)))
}

#[test]
fn meal_construction_preserves_total_spend() {
    let (total, meals) = meals_for(&sample_year());
    let meal_total: i64 = meals.iter().map(|m| m.amount).sum();
    assert_eq!(meal_total, total);
    assert_eq!(total, 600 + 500 + 800 + 2600 + 1800 + 3500);
}

#[test]
fn meals_are_chronological_and_split_on_gap() {
    let (_, meals) = meals_for(&sample_year());
    // 07:30 and 12:00 on 3/1 are more than an hour apart; 12:00 and 12:30 merge.
    let amounts: Vec<i64> = meals.iter().map(|m| m.amount).collect();
    assert_eq!(amounts, vec![600, 1300, 2600, 1800, 3500]);
    assert_eq!(meals[1].num_stalls, 2);
    assert!(meals.windows(2).all(|w| w[0].date <= w[1].date));
}

#[test]
fn placeholder_location_is_backfilled_end_to_end() {
    let rows = vec![raw("2025-03-02 18:10:00", "-", "西区食堂_麻辣香锅", 2600, "1210")];
    let report = analyze_with(&rows, &ReportOptions::default(), frozen_clock()).unwrap();
    assert_eq!(report.favorites.most_visited_cafeteria, "西区食堂");
    assert_eq!(report.raw_transactions[0].location, "-");
}

#[test]
fn non_dining_code_never_becomes_a_meal() {
    let rows = vec![raw("2025-03-01 12:00:00", "桃李园", "桃李园_面食", 800, "1220")];
    let report = analyze_with(&rows, &ReportOptions::default(), frozen_clock()).unwrap();
    assert_eq!(report.basic.total_meals, 0);
    assert_eq!(report.basic.total_amount, 0);
    // still visible to whole-card statistics
    assert_eq!(report.campus_timeline_stats.total_active_days, 1);
}

#[test]
fn empty_input_yields_empty_report() {
    let report = analyze_with(&[], &ReportOptions::default(), frozen_clock()).unwrap();
    assert_eq!(report.basic.total_amount, 0);
    assert_eq!(report.basic.total_meals, 0);
    assert_eq!(report.basic.num_unique_cafeterias, 0);
    assert!(report.favorites.cafeterias_spent.is_empty());
    assert!(report.loyalty.cafeteria_loyalty_ranking.is_empty());
    assert_eq!(report.monthly.monthly_spending.len(), 12);
    assert_eq!(report.monthly.low_month.month, 1);
    assert_eq!(report.monthly.low_month.amount, 0);
    assert_eq!(report.prices.dominant_price_type, PriceTier::Frugal);
    assert_eq!(report.weekday_weekend_stats.comparison, Comparison::Balanced);
    assert_eq!(report.holiday_meal.new_year_first_meal.date, epoch());
    assert_eq!(report.water_utilities_stats.total_transactions, 0);
    assert_eq!(report.balance_management_stats.lowest_balance, 0);
    assert_eq!(report.beyond_dining_stats.non_meal_transactions, 0);
    assert_eq!(report.campus_timeline_stats.longest_streak, 0);
    assert!(report.achievement_badges.iter().all(|b| !b.earned));
    assert_eq!(report.achievement_badges.len(), 5);
    assert!(report.raw_transactions.is_empty());
}

#[test]
fn analysis_is_deterministic_with_a_frozen_clock() {
    let rows = sample_year();
    let a = analyze_with(&rows, &ReportOptions::default(), frozen_clock()).unwrap();
    let b = analyze_with(&rows, &ReportOptions::default(), frozen_clock()).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn default_analyze_only_differs_in_timestamp() {
    let rows = sample_year();
    let mut a = analyze(&rows).unwrap();
    let b = analyze_with(&rows, &ReportOptions::default(), frozen_clock()).unwrap();
    a.last_updated = b.last_updated;
    assert_eq!(a, b);
}

#[test]
fn sample_year_statistics() {
    let report = analyze_with(&sample_year(), &ReportOptions::default(), frozen_clock()).unwrap();

    assert_eq!(report.basic.total_meals, 5);
    assert_eq!(report.basic.num_unique_cafeterias, 2);
    assert_eq!(report.favorites.most_visited_cafeteria, "桃李园");
    assert_eq!(report.favorites.most_spent_cafeteria, "清芬园");
    assert_eq!(report.favorites.most_spent_cafeteria_amount, 5300);
    assert_eq!(report.most_expensive.most_expensive_meal_amount, 3500);
    assert_eq!(report.most_stalls.most_num_stalls_meal_stalls, 2);
    assert_eq!(report.monthly.peak_month.month, 3);
    assert_eq!(report.monthly.low_month.month, 7);
    assert_eq!(report.seasons.best_season, Season::Summer);
    assert_eq!(report.visits.num_visited_dates, 4);

    assert_eq!(report.water_utilities_stats.total_transactions, 1);
    assert_eq!(report.water_utilities_stats.most_frequent_hour, 21);
    assert_eq!(report.balance_management_stats.top_up_count, 1);
    assert_eq!(
        report.balance_management_stats.management_type,
        ManagementStyle::WellPrepared
    );
    assert_eq!(report.campus_timeline_stats.first_transaction.location, "桃李园");
    assert_eq!(report.campus_timeline_stats.longest_streak, 4);
    assert_eq!(report.campus_timeline_stats.most_active_month, 3);
}

#[test]
fn cheap_year_is_frugal() {
    let rows: Vec<RawTransaction> = (1..=9)
        .map(|d| raw(&format!("2025-04-0{d} 12:00:00"), "桃李园", "桃李园_面食", 350 + d * 50, "1210"))
        .collect();
    let report = analyze_with(&rows, &ReportOptions::default(), frozen_clock()).unwrap();
    assert_eq!(report.prices.dominant_price_type, PriceTier::Frugal);
    let sum: f64 = report.prices.price_distribution.iter().map(|b| b.percentage).sum();
    assert!((sum - 100.0).abs() < 1e-9);
}

#[test]
fn holiday_cutoff_is_configurable() {
    let rows = sample_year();
    let options = ReportOptions {
        holiday: chrono::NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        ..ReportOptions::default()
    };
    let report = analyze_with(&rows, &options, frozen_clock()).unwrap();
    assert_eq!(report.holiday_meal.new_year_first_meal.cafeteria, "清芬园");
    assert_eq!(
        report.holiday_meal.new_year_first_meal.date.to_rfc3339(),
        "2025-07-15T12:00:00+08:00"
    );
}

#[test]
fn malformed_timestamp_propagates() {
    let rows = vec![raw("not a date", "桃李园", "桃李园_面食", 800, "1210")];
    let err = analyze_with(&rows, &ReportOptions::default(), frozen_clock()).unwrap_err();
    assert!(matches!(err, ReportError::InvalidTimestamp { .. }));
}

#[test]
fn serialized_report_is_one_flat_object() {
    let report = analyze_with(&sample_year(), &ReportOptions::default(), frozen_clock()).unwrap();
    let value = serde_json::to_value(&report).unwrap();
    let obj = value.as_object().unwrap();
    for key in [
        "totalAmount",
        "mostVisitedCafeteria",
        "mostCostlyCafeteria",
        "breakfastMostFrequent",
        "newYearFirstMeal",
        "mostExpensiveMealAmount",
        "mostNumStallsMealStalls",
        "numVisitedDates",
        "monthlySpending",
        "priceDistribution",
        "weekdayWeekendStats",
        "seasonalPatterns",
        "cafeteriaLoyaltyRanking",
        "lateNightMealsCount",
        "achievementBadges",
        "waterUtilitiesStats",
        "balanceManagementStats",
        "beyondDiningStats",
        "campusTimelineStats",
        "lastUpdated",
        "rawTransactions",
    ] {
        assert!(obj.contains_key(key), "missing {key}");
    }
    assert_eq!(obj["rawTransactions"][0]["meraddr"], "清芬园");

    // verdicts carry their display text, keys stay ids
    assert_eq!(obj["dominantPriceType"], "经济实惠型");
    assert_eq!(obj["bestSeason"], "夏季");
    assert_eq!(obj["seasonalPatterns"][1]["season"], "summer");
    assert_eq!(obj["balanceManagementStats"]["managementType"], "未雨绸缪型");
}

#[test]
fn provider_nulls_do_not_abort_the_report() {
    let payload = r#"{"resultData":{"rows":[
        {"txdate":"2025-03-01 12:00:00","meraddr":"-","mername":null,"txamt":999,"balance":null,"txcode":"1210","summary":null},
        {"txdate":"2025-03-01 12:20:00","meraddr":"桃李园","mername":"桃李园_面食","txamt":800,"balance":9000,"txcode":"1210","summary":"持卡人消费","txname":null}
    ],"total":2}}"#;
    let (rows, load) = card_report::loader::parse_json(payload).unwrap();
    assert_eq!(load.total_rows, 2);

    let report = analyze_with(&rows, &ReportOptions::default(), frozen_clock()).unwrap();
    assert_eq!(report.basic.total_meals, 1);
    assert_eq!(report.basic.total_amount, 800);
    assert_eq!(report.raw_transactions.len(), 2);
}
