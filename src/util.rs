// Shared helpers: insertion-ordered grouping, first-wins folds, streaks,
// local-time handling and money formatting.
//
// Aggregation code leans on these so tie-breaks stay deterministic: whatever
// key was seen first wins an exact tie.
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike, Utc};
use num_format::{Locale, ToFormattedString};
use std::collections::HashMap;
use std::hash::Hash;

/// Card timestamps carry no offset; they are local time in UTC+8.
pub const LOCAL_OFFSET_SECS: i32 = 8 * 3600;

pub fn local_offset() -> FixedOffset {
    FixedOffset::east_opt(LOCAL_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// 1970-01-01T08:00:00+08:00, the placeholder for "no such meal".
pub fn epoch() -> DateTime<FixedOffset> {
    local_offset().from_utc_datetime(&NaiveDateTime::default())
}

/// Minutes since local midnight.
pub fn minute_of_day(at: &DateTime<FixedOffset>) -> u32 {
    at.hour() * 60 + at.minute()
}

/// A mapping that remembers the order keys were first inserted in.
#[derive(Debug, Clone)]
pub struct OrderedMap<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<(K, V)>,
}

impl<K: Eq + Hash + Clone, V: Default> OrderedMap<K, V> {
    pub fn new() -> Self {
        OrderedMap {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Accumulator for `key`, inserted with `V::default()` on first sight.
    pub fn entry(&mut self, key: K) -> &mut V {
        let pos = match self.index.get(&key) {
            Some(&pos) => pos,
            None => {
                self.entries.push((key.clone(), V::default()));
                self.index.insert(key, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn into_entries(self) -> Vec<(K, V)> {
        self.entries
    }
}

impl<K: Eq + Hash + Clone, V: Default> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts occurrences of each key in first-seen order.
pub fn count_by<T, K, F>(items: &[T], key: F) -> OrderedMap<K, usize>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut counts: OrderedMap<K, usize> = OrderedMap::new();
    for item in items {
        *counts.entry(key(item)) += 1;
    }
    counts
}

/// Left fold keeping the first element with the strictly greatest key.
pub fn max_by_first<I, T, N, F>(items: I, key: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    N: PartialOrd,
    F: Fn(&T) -> N,
{
    items.into_iter().fold(None, |best, item| match best {
        Some(b) if key(&item) > key(&b) => Some(item),
        Some(b) => Some(b),
        None => Some(item),
    })
}

/// Left fold keeping the first element with the strictly smallest key.
pub fn min_by_first<I, T, N, F>(items: I, key: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    N: PartialOrd,
    F: Fn(&T) -> N,
{
    items.into_iter().fold(None, |best, item| match best {
        Some(b) if key(&item) < key(&b) => Some(item),
        Some(b) => Some(b),
        None => Some(item),
    })
}

/// Most frequent key of a counter; first-inserted wins ties.
pub fn most_frequent<K: Eq + Hash + Clone>(counts: &OrderedMap<K, usize>) -> Option<(K, usize)> {
    max_by_first(counts.iter(), |(_, c)| **c).map(|(k, c)| (k.clone(), *c))
}

/// Sorted, de-duplicated calendar dates.
pub fn distinct_dates<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Vec<NaiveDate> {
    let mut v: Vec<NaiveDate> = dates.into_iter().collect();
    v.sort_unstable();
    v.dedup();
    v
}

/// Longest run of dates exactly one day apart. Expects sorted, distinct
/// dates; returns 0 for an empty slice.
pub fn longest_streak(dates: &[NaiveDate]) -> usize {
    let mut best = 0usize;
    let mut current = 0usize;
    let mut prev: Option<NaiveDate> = None;
    for &d in dates {
        current = match prev {
            Some(p) if (d - p).num_days() == 1 => current + 1,
            _ => 1,
        };
        best = best.max(current);
        prev = Some(d);
    }
    best
}

pub fn average(total: i64, count: usize) -> f64 {
    // Mean of an integer total; 0 for an empty group to avoid NaNs.
    if count == 0 {
        return 0.0;
    }
    total as f64 / count as f64
}

pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with locale-aware thousands separators, e.g. `1,234.50`.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Cents rendered as yuan with two decimals.
pub fn format_yuan(cents: i64) -> String {
    format_number(cents as f64 / 100.0, 2)
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
