// Statistics computed from cleaned transactions and reconstructed meals.
//
// Each function is independent and total: an empty input produces the
// zero-valued shape of its result.
use crate::labels::{BadgeKind, Comparison, PriceTier, Season};
use crate::types::{
    AchievementBadge, BasicStats, CafeteriaLoyalty, CafeteriaSpend, ClockTime, CostStats,
    DayGroupStats, FavoriteStats, HolidayMeal, LoyaltyStats, Meal, MealRef, MealTimeStats,
    MonthAmount, MonthlySpending, MonthlyTrends, MostExpensiveMeal, MostStallsMeal, PriceBucket,
    PriceDistribution, SeasonalPattern, SeasonalStats, TimeHabits, Transaction, VisitStats,
    WeekdayWeekendStats,
};
use crate::util::{
    average, count_by, distinct_dates, epoch, longest_streak, max_by_first, min_by_first,
    minute_of_day, most_frequent, percentage, OrderedMap,
};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Weekday};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Meals starting at or after this hour are late-night meals.
const LATE_NIGHT_HOUR: u32 = 20;
/// Meals starting in `[6, 10)` count towards breakfast days.
const BREAKFAST_HOURS: std::ops::Range<u32> = 6..10;
const TOP_LOYALTY: usize = 5;

/// Totals over dining transactions; the meal count comes from the
/// reconstructed meals.
pub fn basic_stats(transactions: &[Transaction], meals: &[Meal]) -> BasicStats {
    let cafeterias: HashSet<&str> = transactions.iter().map(|t| t.cafeteria.as_str()).collect();
    let stalls: HashSet<&str> = transactions.iter().map(|t| t.stall.as_str()).collect();
    let stats = BasicStats {
        total_amount: transactions.iter().map(|t| t.amount).sum(),
        total_meals: meals.len(),
        num_unique_cafeterias: cafeterias.len(),
        num_unique_stalls: stalls.len(),
    };
    tracing::debug!(?stats, "basic stats");
    stats
}

// Visits are meals, not swipes: three stalls in one sitting is one visit.
fn most_visited(meals: &[Meal]) -> (String, usize) {
    most_frequent(&count_by(meals, |m| m.cafeteria.clone())).unwrap_or_default()
}

fn spend_by<F>(transactions: &[Transaction], key: F) -> OrderedMap<String, i64>
where
    F: Fn(&Transaction) -> &str,
{
    let mut spent: OrderedMap<String, i64> = OrderedMap::new();
    for t in transactions {
        *spent.entry(key(t).to_string()) += t.amount;
    }
    spent
}

/// Most visited cafeteria (by meals), most spent cafeteria and stall (by
/// transaction amounts), plus the full spending ranking.
pub fn favorites(transactions: &[Transaction], meals: &[Meal]) -> FavoriteStats {
    let (most_visited_cafeteria, most_visited_cafeteria_count) = most_visited(meals);

    let mut cafeterias_spent: Vec<CafeteriaSpend> = spend_by(transactions, |t| t.cafeteria.as_str())
        .into_entries()
        .into_iter()
        .map(|(cafeteria, amount)| CafeteriaSpend { cafeteria, amount })
        .collect();
    // stable: first-seen cafeteria stays ahead on equal spend
    cafeterias_spent.sort_by(|a, b| b.amount.cmp(&a.amount));

    let (most_spent_stall, most_spent_stall_amount) =
        max_by_first(spend_by(transactions, |t| t.stall.as_str()).into_entries(), |e| e.1)
            .unwrap_or_default();

    let (most_spent_cafeteria, most_spent_cafeteria_amount) = cafeterias_spent
        .first()
        .map(|c| (c.cafeteria.clone(), c.amount))
        .unwrap_or_default();

    tracing::debug!(
        most_visited = %most_visited_cafeteria,
        most_spent = %most_spent_cafeteria,
        stall = %most_spent_stall,
        "favorites"
    );
    FavoriteStats {
        most_visited_cafeteria,
        most_visited_cafeteria_count,
        most_spent_cafeteria,
        most_spent_cafeteria_amount,
        most_spent_stall,
        most_spent_stall_amount,
        cafeterias_spent,
    }
}

/// Highest and lowest mean meal cost per cafeteria.
pub fn cost_extremes(meals: &[Meal]) -> CostStats {
    let mut totals: OrderedMap<String, (i64, usize)> = OrderedMap::new();
    for m in meals {
        let e = totals.entry(m.cafeteria.clone());
        e.0 += m.amount;
        e.1 += 1;
    }
    let mut avg_costs: Vec<(String, f64)> = totals
        .into_entries()
        .into_iter()
        .map(|(cafeteria, (total, count))| (cafeteria, average(total, count)))
        .collect();
    // Stable descending sort. The head is the dearest and the tail the
    // cheapest, so with one cafeteria both ends name it, and on equal means
    // the cheapest is the later-seen one.
    avg_costs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let (most_costly_cafeteria, most_costly_cafeteria_cost) =
        avg_costs.first().cloned().unwrap_or_default();
    let (most_cheap_cafeteria, most_cheap_cafeteria_cost) =
        avg_costs.last().cloned().unwrap_or_default();
    CostStats {
        most_costly_cafeteria,
        most_costly_cafeteria_cost,
        most_cheap_cafeteria,
        most_cheap_cafeteria_cost,
    }
}

fn most_frequent_clock(counts: &OrderedMap<(u32, u32), usize>) -> ClockTime {
    most_frequent(counts)
        .map(|((hour, minute), count)| ClockTime { hour, minute, count })
        .unwrap_or_default()
}

/// Most common start minute per meal slot, plus the earliest and latest
/// meal by time of day regardless of date.
pub fn time_habits(meals: &[Meal]) -> TimeHabits {
    let mut breakfast: OrderedMap<(u32, u32), usize> = OrderedMap::new();
    let mut lunch: OrderedMap<(u32, u32), usize> = OrderedMap::new();
    let mut dinner: OrderedMap<(u32, u32), usize> = OrderedMap::new();
    for m in meals {
        let key = (m.date.hour(), m.date.minute());
        let slot = match key.0 {
            0..=9 => &mut breakfast,
            10..=14 => &mut lunch,
            _ => &mut dinner,
        };
        *slot.entry(key) += 1;
    }

    // Clock time only; the calendar date never decides earliest/latest.
    let earliest = min_by_first(meals, |m| minute_of_day(&m.date)).map_or_else(epoch, |m| m.date);
    let latest = max_by_first(meals, |m| minute_of_day(&m.date)).map_or_else(epoch, |m| m.date);

    TimeHabits {
        breakfast_most_frequent: most_frequent_clock(&breakfast),
        lunch_most_frequent: most_frequent_clock(&lunch),
        dinner_most_frequent: most_frequent_clock(&dinner),
        earliest,
        latest,
    }
}

/// First meal strictly after `cutoff`; an epoch placeholder if none.
pub fn holiday_first_meal(meals: &[Meal], cutoff: DateTime<FixedOffset>) -> HolidayMeal {
    let new_year_first_meal = meals
        .iter()
        .find(|m| m.date > cutoff)
        .map(|m| MealRef {
            date: m.date,
            cafeteria: m.cafeteria.clone(),
        })
        .unwrap_or_else(|| MealRef {
            date: epoch(),
            cafeteria: String::new(),
        });
    HolidayMeal { new_year_first_meal }
}

pub fn most_expensive_meal(meals: &[Meal]) -> MostExpensiveMeal {
    match max_by_first(meals, |m| m.amount) {
        Some(m) => MostExpensiveMeal {
            most_expensive_meal_date: m.date,
            most_expensive_meal_amount: m.amount,
            most_expensive_meal_cafeteria: m.cafeteria.clone(),
        },
        None => MostExpensiveMeal {
            most_expensive_meal_date: epoch(),
            most_expensive_meal_amount: 0,
            most_expensive_meal_cafeteria: String::new(),
        },
    }
}

pub fn most_stalls_meal(meals: &[Meal]) -> MostStallsMeal {
    match max_by_first(meals, |m| m.num_stalls) {
        Some(m) => MostStallsMeal {
            most_num_stalls_meal_date: m.date,
            most_num_stalls_meal_stalls: m.num_stalls,
            most_num_stalls_cafeteria: m.cafeteria.clone(),
        },
        None => MostStallsMeal {
            most_num_stalls_meal_date: epoch(),
            most_num_stalls_meal_stalls: 0,
            most_num_stalls_cafeteria: String::new(),
        },
    }
}

/// Distinct purchase days, plus the longest run of empty days between two
/// of them.
pub fn visit_stats(transactions: &[Transaction]) -> VisitStats {
    let dates = distinct_dates(transactions.iter().map(|t| t.date.date_naive()));

    // Neighbouring visit days more than one day apart bound a gap; the gap
    // itself runs from the day after the first to the day before the second.
    let widest: Option<(NaiveDate, NaiveDate)> = max_by_first(
        dates.windows(2).map(|w| (w[0], w[1])).filter(|(a, b)| (*b - *a).num_days() > 1),
        |(a, b)| (*b - *a).num_days(),
    );
    let (begin, end, days) = match widest {
        Some((before, after)) => (
            before.succ_opt(),
            after.pred_opt(),
            (after - before).num_days() - 1,
        ),
        None => (None, None, 0),
    };

    VisitStats {
        num_visited_dates: dates.len(),
        max_consecutive_no_record_date_begin: begin,
        max_consecutive_no_record_date_end: end,
        max_consecutive_no_record_days: days,
    }
}

pub fn monthly_trends(meals: &[Meal]) -> MonthlyTrends {
    let mut monthly_spending: Vec<MonthlySpending> = (1..=12)
        .map(|month| MonthlySpending {
            month,
            ..Default::default()
        })
        .collect();
    for m in meals {
        let slot = &mut monthly_spending[m.date.month0() as usize];
        slot.amount += m.amount;
        slot.meal_count += 1;
    }

    // Empty months would always win "low month", so only months with
    // spending compete.
    let active: Vec<&MonthlySpending> = monthly_spending.iter().filter(|m| m.amount > 0).collect();
    let to_month = |m: &MonthlySpending| MonthAmount {
        month: m.month,
        amount: m.amount,
    };
    let peak_month = max_by_first(active.iter().copied(), |m| m.amount)
        .map(to_month)
        .unwrap_or_default();
    let low_month = min_by_first(active.iter().copied(), |m| m.amount)
        .map(to_month)
        .unwrap_or_default();
    let total: i64 = monthly_spending.iter().map(|m| m.amount).sum();
    let monthly_average = average(total, active.len());

    MonthlyTrends {
        monthly_spending,
        peak_month,
        low_month,
        monthly_average,
    }
}

pub fn price_distribution(meals: &[Meal]) -> PriceDistribution {
    let counts: Vec<usize> = PriceTier::ALL
        .iter()
        .map(|tier| meals.iter().filter(|m| tier.contains(m.amount)).count())
        .collect();

    let price_distribution: Vec<PriceBucket> = PriceTier::ALL
        .iter()
        .zip(&counts)
        .map(|(&tier, &count)| PriceBucket {
            tier,
            range: tier.range_label(),
            min: tier.min(),
            max: tier.max(),
            count,
            percentage: percentage(count, meals.len()),
        })
        .collect();

    let dominant_price_type = max_by_first(price_distribution.iter(), |b| b.count)
        .map_or(PriceTier::Frugal, |b| b.tier);
    PriceDistribution {
        price_distribution,
        dominant_price_type,
    }
}

// Shared by the weekday/weekend split and the seasons.
fn day_group(meals: &[&Meal]) -> DayGroupStats {
    let total: i64 = meals.iter().map(|m| m.amount).sum();
    let top_cafeteria = most_frequent(&count_by(meals, |m| m.cafeteria.clone()))
        .map(|(c, _)| c)
        .unwrap_or_default();
    DayGroupStats {
        avg_cost: average(total, meals.len()),
        meal_count: meals.len(),
        top_cafeteria,
    }
}

/// A side must beat the other by more than 10% to win the comparison.
pub fn compare_days(weekday_avg: f64, weekend_avg: f64) -> Comparison {
    if weekend_avg > weekday_avg * 1.1 {
        Comparison::WeekendIndulges
    } else if weekday_avg > weekend_avg * 1.1 {
        Comparison::WeekdayEatsBetter
    } else {
        Comparison::Balanced
    }
}

pub fn weekday_weekend(meals: &[Meal]) -> WeekdayWeekendStats {
    let (weekend, weekday): (Vec<&Meal>, Vec<&Meal>) = meals
        .iter()
        .partition(|m| matches!(m.date.weekday(), Weekday::Sat | Weekday::Sun));
    let weekday = day_group(&weekday);
    let weekend = day_group(&weekend);
    let comparison = compare_days(weekday.avg_cost, weekend.avg_cost);
    WeekdayWeekendStats {
        weekday,
        weekend,
        comparison,
    }
}

pub fn seasonal_patterns(meals: &[Meal]) -> SeasonalStats {
    let seasonal_patterns: Vec<SeasonalPattern> = Season::ALL
        .iter()
        .map(|&season| {
            let in_season: Vec<&Meal> = meals
                .iter()
                .filter(|m| Season::of_month(m.date.month()) == season)
                .collect();
            let group = day_group(&in_season);
            SeasonalPattern {
                season,
                avg_cost: group.avg_cost,
                meal_count: group.meal_count,
                top_cafeteria: group.top_cafeteria,
            }
        })
        .collect();
    let best_season = max_by_first(seasonal_patterns.iter(), |s| s.avg_cost)
        .map_or(Season::Spring, |s| s.season);
    SeasonalStats {
        seasonal_patterns,
        best_season,
    }
}

/// Distinct visit days and longest daily streak per cafeteria, best first.
pub fn cafeteria_loyalty(meals: &[Meal]) -> LoyaltyStats {
    let mut days: OrderedMap<String, Vec<NaiveDate>> = OrderedMap::new();
    for m in meals {
        days.entry(m.cafeteria.clone()).push(m.date.date_naive());
    }
    let mut ranking: Vec<CafeteriaLoyalty> = days
        .into_entries()
        .into_iter()
        .map(|(cafeteria, dates)| {
            let dates = distinct_dates(dates);
            CafeteriaLoyalty {
                cafeteria,
                total_days: dates.len(),
                // over the whole year, not over active months
                avg_monthly: dates.len() as f64 / 12.0,
                max_streak: longest_streak(&dates),
            }
        })
        .collect();
    ranking.sort_by(|a, b| b.total_days.cmp(&a.total_days));

    LoyaltyStats {
        most_frequent_cafeteria: ranking.first().cloned().unwrap_or_default(),
        cafeteria_loyalty_ranking: ranking.into_iter().take(TOP_LOYALTY).collect(),
    }
}

pub fn meal_time_stats(meals: &[Meal]) -> MealTimeStats {
    let late_night_meals_count = meals.iter().filter(|m| m.date.hour() >= LATE_NIGHT_HOUR).count();
    let breakfast_days: HashSet<NaiveDate> = meals
        .iter()
        .filter(|m| BREAKFAST_HOURS.contains(&m.date.hour()))
        .map(|m| m.date.date_naive())
        .collect();
    MealTimeStats {
        late_night_meals_count,
        breakfast_days_count: breakfast_days.len(),
    }
}

/// Every badge, earned or not, in catalogue order.
pub fn achievements(
    meals: &[Meal],
    basic: &BasicStats,
    meal_times: &MealTimeStats,
) -> Vec<AchievementBadge> {
    BadgeKind::ALL
        .iter()
        .map(|&kind| {
            let value = match kind {
                BadgeKind::Explorer => basic.num_unique_cafeterias as i64,
                BadgeKind::NightOwl => meal_times.late_night_meals_count as i64,
                BadgeKind::BreakfastHero => meal_times.breakfast_days_count as i64,
                BadgeKind::Vip => basic.total_amount,
                BadgeKind::Regular => meals.len() as i64,
            };
            let text = kind.text();
            AchievementBadge {
                id: text.id,
                name: text.name,
                emoji: text.emoji,
                description: kind.describe(value),
                earned: value >= text.threshold,
                value,
            }
        })
        .collect()
}
