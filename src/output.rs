use crate::error::ReportError;
use crate::types::{RawTransaction, ReportData};
use crate::util::{format_number, format_yuan};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CafeteriaRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Cafeteria")]
    #[tabled(rename = "Cafeteria")]
    pub cafeteria: String,
    #[serde(rename = "Spent")]
    #[tabled(rename = "Spent")]
    pub spent: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MonthRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: u32,
    #[serde(rename = "Meals")]
    #[tabled(rename = "Meals")]
    pub meals: usize,
    #[serde(rename = "Spent")]
    #[tabled(rename = "Spent")]
    pub spent: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PriceRow {
    #[serde(rename = "Range")]
    #[tabled(rename = "Range")]
    pub range: String,
    #[serde(rename = "Meals")]
    #[tabled(rename = "Meals")]
    pub meals: usize,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share")]
    pub share: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct LoyaltyRow {
    #[serde(rename = "Cafeteria")]
    #[tabled(rename = "Cafeteria")]
    pub cafeteria: String,
    #[serde(rename = "Days")]
    #[tabled(rename = "Days")]
    pub days: usize,
    #[serde(rename = "MaxStreak")]
    #[tabled(rename = "MaxStreak")]
    pub max_streak: usize,
}

#[derive(Debug, Tabled, Clone)]
pub struct BadgeRow {
    #[tabled(rename = "Badge")]
    pub badge: String,
    #[tabled(rename = "Earned")]
    pub earned: String,
    #[tabled(rename = "Description")]
    pub description: String,
}

// Row builders flatten report groups into display rows. Amounts are
// pre-formatted as yuan strings so the CSV and the preview agree.
pub fn cafeteria_rows(report: &ReportData) -> Vec<CafeteriaRow> {
    report
        .favorites
        .cafeterias_spent
        .iter()
        .enumerate()
        .map(|(idx, c)| CafeteriaRow {
            rank: idx + 1,
            cafeteria: c.cafeteria.clone(),
            spent: format_yuan(c.amount),
        })
        .collect()
}

pub fn month_rows(report: &ReportData) -> Vec<MonthRow> {
    report
        .monthly
        .monthly_spending
        .iter()
        .map(|m| MonthRow {
            month: m.month,
            meals: m.meal_count,
            spent: format_yuan(m.amount),
        })
        .collect()
}

pub fn price_rows(report: &ReportData) -> Vec<PriceRow> {
    report
        .prices
        .price_distribution
        .iter()
        .map(|b| PriceRow {
            range: b.range.to_string(),
            meals: b.count,
            share: format!("{}%", format_number(b.percentage, 1)),
        })
        .collect()
}

pub fn loyalty_rows(report: &ReportData) -> Vec<LoyaltyRow> {
    report
        .loyalty
        .cafeteria_loyalty_ranking
        .iter()
        .map(|l| LoyaltyRow {
            cafeteria: l.cafeteria.clone(),
            days: l.total_days,
            max_streak: l.max_streak,
        })
        .collect()
}

pub fn badge_rows(report: &ReportData) -> Vec<BadgeRow> {
    report
        .achievement_badges
        .iter()
        .map(|b| BadgeRow {
            badge: format!("{} {}", b.emoji, b.name),
            earned: if b.earned { "yes" } else { "no" }.to_string(),
            description: b.description.clone(),
        })
        .collect()
}

/// Writes `rows` with a header line taken from the serde field names.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ReportError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Raw-data export: one record per line, in the provider's field names.
pub fn write_jsonl(path: &Path, rows: &[RawTransaction]) -> Result<(), ReportError> {
    let mut out = BufWriter::new(File::create(path)?);
    for row in rows {
        serde_json::to_writer(&mut out, row)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Markdown table of at most `max_rows` rows, or a placeholder when empty.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(title: &str, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", title);
    println!("{}\n", render_table(rows, max_rows));
}
