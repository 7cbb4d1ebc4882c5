use crate::types::{Meal, Transaction};
use chrono::{DateTime, Duration, FixedOffset};
use std::collections::HashSet;

struct OpenMeal<'a> {
    date: DateTime<FixedOffset>,
    cafeteria: &'a str,
    amount: i64,
    stalls: HashSet<&'a str>,
    last_seen: DateTime<FixedOffset>,
}

impl<'a> OpenMeal<'a> {
    fn start(t: &'a Transaction) -> Self {
        OpenMeal {
            date: t.date,
            cafeteria: &t.cafeteria,
            amount: t.amount,
            stalls: HashSet::from([t.stall.as_str()]),
            last_seen: t.date,
        }
    }

    /// Same cafeteria and less than `gap` after the previous purchase. The
    /// gap is measured from the last purchase, not from the meal start.
    fn accepts(&self, t: &Transaction, gap: Duration) -> bool {
        t.cafeteria == self.cafeteria && t.date - self.last_seen < gap
    }

    fn absorb(&mut self, t: &'a Transaction) {
        self.amount += t.amount;
        self.stalls.insert(&t.stall);
        self.last_seen = t.date;
    }

    fn close(self) -> Meal {
        Meal {
            date: self.date,
            cafeteria: self.cafeteria.to_string(),
            amount: self.amount,
            num_stalls: self.stalls.len(),
        }
    }
}

/// Cluster dining purchases into meals, in chronological order.
pub fn construct_meals(transactions: &[Transaction], gap: Duration) -> Vec<Meal> {
    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by_key(|t| t.date);

    let mut meals = Vec::new();
    let mut open: Option<OpenMeal<'_>> = None;
    for t in sorted {
        open = Some(match open {
            Some(mut current) if current.accepts(t, gap) => {
                current.absorb(t);
                current
            }
            Some(current) => {
                meals.push(current.close());
                OpenMeal::start(t)
            }
            None => OpenMeal::start(t),
        });
    }
    if let Some(current) = open {
        meals.push(current.close());
    }

    tracing::info!(meals = meals.len(), transactions = transactions.len(), "constructed meals");
    meals
}
