// Card usage beyond meals, computed over every back-filled raw record:
// shower/water spending, top-ups and balance, non-meal purchases and the
// overall activity timeline.
use crate::labels::{BeyondCategory, ManagementStyle};
use crate::types::{
    BalanceStats, BeyondDiningStats, CampusTimelineStats, CardRecord, CategoryTotal, TimelineEvent,
    UtilityStats,
};
use crate::util::{
    average, count_by, distinct_dates, epoch, longest_streak, min_by_first, most_frequent,
    OrderedMap,
};
use chrono::{Datelike, Timelike};

/// Summary/name of a bank-to-card top-up.
pub const TOP_UP_KEYWORD: &str = "中行圈存";
/// Summary of a water-control (shower, hot water) POS record.
pub const UTILITY_SUMMARY: &str = "水控POS消费流水";
pub const SHOWER_KEYWORD: &str = "淋浴";
/// Location of online top-ups, which are never purchases.
pub const ONLINE_TOP_UP_LOCATION: &str = "在线充值";
/// Stall-name fragments that mark an ordinary meal counter.
pub const MEAL_KEYWORDS: [&str; 16] = [
    "大伙", "主食", "烤肉", "风味", "点菜", "拌饭", "面食", "川渝", "湘菜", "粤", "河南", "朝鲜",
    "日式", "韩式", "套餐", "自选",
];
/// Top-up count at which the holder counts as a last-minute manager.
const FREQUENT_TOP_UPS: usize = 10;
/// Lowest balance (cents) above which the holder counts as well prepared.
const COMFORTABLE_BALANCE: i64 = 5000;
const DEFAULT_KIND: &str = "消费";

pub fn is_top_up(r: &CardRecord<'_>) -> bool {
    r.raw.summary() == TOP_UP_KEYWORD || r.raw.name() == TOP_UP_KEYWORD
}

pub fn is_utility(r: &CardRecord<'_>) -> bool {
    r.raw.summary() == UTILITY_SUMMARY
        || r.raw.location.contains(SHOWER_KEYWORD)
        || r.raw.merchant.contains(SHOWER_KEYWORD)
}

pub fn utility_usage(records: &[CardRecord<'_>]) -> UtilityStats {
    let utility: Vec<&CardRecord<'_>> = records.iter().filter(|r| is_utility(r)).collect();
    if utility.is_empty() {
        return UtilityStats::default();
    }
    let total_amount: i64 = utility.iter().map(|r| r.raw.amount).sum();
    let days = distinct_dates(utility.iter().map(|r| r.at.date_naive()));
    let most_frequent_hour = most_frequent(&count_by(&utility, |r| r.at.hour()))
        .map(|(hour, _)| hour)
        .unwrap_or_default();
    UtilityStats {
        total_transactions: utility.len(),
        total_amount,
        avg_cost: average(total_amount, utility.len()),
        total_days: days.len(),
        most_frequent_hour,
    }
}

pub fn management_style(top_up_count: usize, lowest_balance: i64) -> ManagementStyle {
    if top_up_count == 0 {
        ManagementStyle::CardRich
    } else if top_up_count >= FREQUENT_TOP_UPS {
        ManagementStyle::LastMinute
    } else if lowest_balance > COMFORTABLE_BALANCE {
        ManagementStyle::WellPrepared
    } else {
        ManagementStyle::LaissezFaire
    }
}

/// Expects records in chronological order.
pub fn balance_management(records: &[CardRecord<'_>]) -> BalanceStats {
    let top_ups: Vec<&CardRecord<'_>> = records.iter().filter(|r| is_top_up(r)).collect();
    let lowest_balance = min_by_first(records.iter().map(|r| r.raw.balance), |b| *b).unwrap_or(0);
    BalanceStats {
        top_up_count: top_ups.len(),
        total_top_up_amount: top_ups.iter().map(|r| r.raw.amount).sum(),
        starting_balance: records.first().map_or(0, |r| r.raw.balance),
        ending_balance: records.last().map_or(0, |r| r.raw.balance),
        lowest_balance,
        management_type: management_style(top_ups.len(), lowest_balance),
    }
}

/// `None` for records that are not "beyond dining": top-ups, utilities,
/// online top-ups and ordinary meal counters, in that order of precedence.
pub fn beyond_category(r: &CardRecord<'_>) -> Option<BeyondCategory> {
    if is_top_up(r) || is_utility(r) || r.raw.location == ONLINE_TOP_UP_LOCATION {
        return None;
    }
    let merchant = r.raw.merchant.as_str();
    if MEAL_KEYWORDS.iter().any(|k| merchant.contains(k)) {
        return None;
    }
    Some(BeyondCategory::classify(merchant))
}

pub fn beyond_dining(records: &[CardRecord<'_>]) -> BeyondDiningStats {
    let mut categories: OrderedMap<BeyondCategory, (usize, i64)> = OrderedMap::new();
    let mut places: OrderedMap<String, usize> = OrderedMap::new();
    let mut count = 0usize;
    let mut amount = 0i64;
    for r in records {
        let Some(category) = beyond_category(r) else {
            continue;
        };
        let e = categories.entry(category);
        e.0 += 1;
        e.1 += r.raw.amount;
        *places.entry(r.raw.location.clone()) += 1;
        count += 1;
        amount += r.raw.amount;
    }

    BeyondDiningStats {
        non_meal_transactions: count,
        non_meal_amount: amount,
        categories: categories
            .into_entries()
            .into_iter()
            .map(|(category, (count, amount))| CategoryTotal {
                category,
                count,
                amount,
            })
            .collect(),
        most_unique_place: most_frequent(&places).map(|(p, _)| p).unwrap_or_default(),
    }
}

fn timeline_event(r: Option<&CardRecord<'_>>) -> TimelineEvent {
    match r {
        Some(r) => {
            let kind = [r.raw.summary(), r.raw.name()]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or(DEFAULT_KIND);
            TimelineEvent {
                date: r.at,
                location: r.raw.location.clone(),
                kind: kind.to_string(),
            }
        }
        None => TimelineEvent {
            date: epoch(),
            location: String::new(),
            kind: String::new(),
        },
    }
}

/// Expects records in chronological order.
pub fn campus_timeline(records: &[CardRecord<'_>]) -> CampusTimelineStats {
    let days = distinct_dates(records.iter().map(|r| r.at.date_naive()));
    let most_active_month = most_frequent(&count_by(records, |r| r.at.month()))
        .map_or(1, |(month, _)| month);
    CampusTimelineStats {
        first_transaction: timeline_event(records.first()),
        last_transaction: timeline_event(records.last()),
        longest_streak: longest_streak(&days),
        most_active_month,
        total_active_days: days.len(),
    }
}
