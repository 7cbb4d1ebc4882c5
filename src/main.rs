// Entry point and high-level CLI flow.
//
// - Load a decrypted card-transaction dump (JSON, JSONL or CSV).
// - Run the analysis pipeline once.
// - Print Markdown previews of the main tables and a short summary.
// - Unless `--no-export` is given, write the full report as JSON, the raw
//   records as JSONL and the ranking tables as CSV into `--out-dir`.
use card_report::labels::Label;
use card_report::output;
use card_report::util::{format_int, format_yuan, local_offset};
use card_report::{analyze_with, loader, ReportData, ReportError, ReportOptions};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "card-report", about = "Annual campus-card dining report")]
struct Cli {
    /// Transaction dump: .json, .jsonl/.ndjson or .csv
    input: PathBuf,

    /// Directory for report.json, transactions.jsonl and the CSV tables
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// The first meal after local midnight of this date is the new-year meal
    #[arg(long, value_name = "YYYY-MM-DD")]
    holiday: Option<NaiveDate>,

    /// Transaction code of a dining purchase
    #[arg(long, default_value = card_report::config::DINING_CODE)]
    dining_code: String,

    /// Rows shown per preview table
    #[arg(long, default_value_t = 5)]
    preview_rows: usize,

    /// Only print previews, write no files
    #[arg(long)]
    no_export: bool,
}

impl Cli {
    fn options(&self) -> ReportOptions {
        let mut opts = ReportOptions {
            dining_code: self.dining_code.clone(),
            ..ReportOptions::default()
        };
        if let Some(day) = self.holiday {
            opts.holiday = day;
        }
        opts
    }
}

fn print_summary(report: &ReportData, preview_rows: usize) {
    let b = &report.basic;
    println!(
        "{} meals, {} yuan across {} cafeterias and {} stalls\n",
        format_int(b.total_meals),
        format_yuan(b.total_amount),
        format_int(b.num_unique_cafeterias),
        format_int(b.num_unique_stalls)
    );

    output::preview_table("Cafeteria Spending Ranking", &output::cafeteria_rows(report), preview_rows);
    output::preview_table("Monthly Spending", &output::month_rows(report), 12);
    output::preview_table("Meal Price Distribution", &output::price_rows(report), 4);
    println!(
        "Dominant type: {}\n",
        report.prices.dominant_price_type.type_name()
    );
    output::preview_table("Cafeteria Loyalty", &output::loyalty_rows(report), preview_rows);
    output::preview_table("Achievements", &output::badge_rows(report), 5);

    let ww = &report.weekday_weekend_stats;
    println!(
        "Weekday avg {} / weekend avg {}: {}",
        format_yuan(ww.weekday.avg_cost.round() as i64),
        format_yuan(ww.weekend.avg_cost.round() as i64),
        ww.comparison.label()
    );
    println!("Best season: {}", report.seasons.best_season.label());
    println!(
        "Card management: {}",
        report.balance_management_stats.management_type.label()
    );

    // Off-menu spending, one line per category in order of first purchase.
    for c in &report.beyond_dining_stats.categories {
        println!(
            "  {}: {} purchases, {} yuan",
            c.category.label(),
            format_int(c.count),
            format_yuan(c.amount)
        );
    }
}

fn export(report: &ReportData, dir: &Path) -> Result<(), ReportError> {
    std::fs::create_dir_all(dir)?;
    output::write_json(&dir.join("report.json"), report)?;
    output::write_jsonl(&dir.join("transactions.jsonl"), &report.raw_transactions)?;
    output::write_csv(&dir.join("cafeteria_ranking.csv"), &output::cafeteria_rows(report))?;
    output::write_csv(&dir.join("monthly_spending.csv"), &output::month_rows(report))?;
    output::write_csv(&dir.join("price_distribution.csv"), &output::price_rows(report))?;
    tracing::info!(dir = %dir.display(), "outputs written");
    Ok(())
}

fn run(cli: &Cli) -> Result<(), ReportError> {
    let (rows, load_report) = loader::load_raw(&cli.input)?;
    tracing::info!(
        rows = load_report.total_rows,
        skipped = load_report.parse_errors,
        "loaded {}",
        cli.input.display()
    );

    let now = Utc::now().with_timezone(&local_offset());
    let report = analyze_with(&rows, &cli.options(), now)?;
    print_summary(&report, cli.preview_rows);

    if !cli.no_export {
        export(&report, &cli.out_dir)?;
        println!("\n(Full report exported to {})", cli.out_dir.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Failed to build report: {}", e);
            ExitCode::FAILURE
        }
    }
}
