use crate::error::ReportError;
use crate::types::{CardRecord, RawTransaction, Transaction};
use crate::util::local_offset;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Location value the provider sends when it has no cafeteria name.
pub const PLACEHOLDER_LOCATION: &str = "-";

/// Drinking water, showers, online retail, card services, printing,
/// swimming and the library are card purchases but never meals.
static NON_DINING: Lazy<Regex> = Lazy::new(|| {
    Regex::new("饮水|淋浴|天猫|学生卡|打印|游泳|图书馆").expect("exclusion pattern is valid")
});

const TIMESTAMP_LAYOUTS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub parse_errors: usize,
}

/// The provider's paged response: `{"resultData": {"rows": [...], "total": n}}`.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "resultData")]
    result_data: Page,
}

#[derive(Deserialize)]
struct Page {
    #[serde(default)]
    rows: Vec<RawTransaction>,
}

/// Read a decrypted provider dump from disk. The format follows the file
/// extension: `.json` (array or `resultData` envelope), `.jsonl`/`.ndjson`,
/// or `.csv` with the wire field names as headers.
pub fn load_raw(path: &Path) -> Result<(Vec<RawTransaction>, LoadReport), ReportError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "json" => parse_json(&fs::read_to_string(path)?),
        "jsonl" | "ndjson" => parse_jsonl(&fs::read_to_string(path)?),
        "csv" => load_csv(path),
        _ => Err(ReportError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

pub fn parse_json(text: &str) -> Result<(Vec<RawTransaction>, LoadReport), ReportError> {
    // Sniff the shape instead of trying both, so a bad record reports its
    // own error rather than a generic shape mismatch.
    let rows = if text.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<RawTransaction>>(text)?
    } else {
        serde_json::from_str::<Envelope>(text)?.result_data.rows
    };
    let report = LoadReport {
        total_rows: rows.len(),
        parse_errors: 0,
    };
    Ok((rows, report))
}

/// One record per line. A malformed line is an error: the export this reads
/// back is written by us, so a bad line means a damaged file.
pub fn parse_jsonl(text: &str) -> Result<(Vec<RawTransaction>, LoadReport), ReportError> {
    let mut rows = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        rows.push(serde_json::from_str::<RawTransaction>(line)?);
    }
    let report = LoadReport {
        total_rows: rows.len(),
        parse_errors: 0,
    };
    Ok((rows, report))
}

fn load_csv(path: &Path) -> Result<(Vec<RawTransaction>, LoadReport), ReportError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut report = LoadReport::default();
    let mut rows = Vec::new();
    for result in rdr.deserialize::<RawTransaction>() {
        report.total_rows += 1;
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                tracing::warn!(row = report.total_rows, error = %e, "skipping unreadable csv row");
                report.parse_errors += 1;
            }
        }
    }
    Ok((rows, report))
}

/// Fill placeholder locations from the merchant prefix (`西区食堂_麻辣香锅`
/// becomes `西区食堂`). Placeholder rows without a merchant name are dropped.
pub fn backfill_locations(rows: &[RawTransaction]) -> Vec<RawTransaction> {
    let kept: Vec<RawTransaction> = rows
        .iter()
        .filter_map(|row| {
            if row.location != PLACEHOLDER_LOCATION {
                return Some(row.clone());
            }
            if row.merchant.is_empty() {
                return None;
            }
            let prefix = row.merchant.split('_').next().unwrap_or_default();
            Some(RawTransaction {
                location: prefix.to_string(),
                ..row.clone()
            })
        })
        .collect();
    tracing::debug!(kept = kept.len(), total = rows.len(), "back-filled locations");
    kept
}

/// Interpret a provider timestamp as UTC+8 local time.
pub fn parse_local_timestamp(value: &str) -> Result<DateTime<FixedOffset>, ReportError> {
    let s = value.trim();
    TIMESTAMP_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
        .and_then(|naive| local_offset().from_local_datetime(&naive).single())
        .ok_or_else(|| ReportError::InvalidTimestamp {
            value: value.to_string(),
        })
}

/// Resolve every timestamp and order records chronologically. Ties keep
/// input order.
pub fn stamp_records(rows: &[RawTransaction]) -> Result<Vec<CardRecord<'_>>, ReportError> {
    let mut records = rows
        .iter()
        .map(|raw| {
            Ok(CardRecord {
                at: parse_local_timestamp(&raw.timestamp)?,
                raw,
            })
        })
        .collect::<Result<Vec<_>, ReportError>>()?;
    records.sort_by_key(|r| r.at);
    Ok(records)
}

/// One canonical transaction per record.
pub fn create_transactions(records: &[CardRecord<'_>]) -> Vec<Transaction> {
    tracing::debug!(records = records.len(), "converting raw transactions");
    records
        .iter()
        .map(|r| Transaction {
            date: r.at,
            cafeteria: r.raw.location.clone(),
            stall: r.raw.merchant.clone(),
            amount: r.raw.amount,
            balance: r.raw.balance,
            code: r.raw.code.clone(),
        })
        .collect()
}

pub fn is_non_dining(name: &str) -> bool {
    NON_DINING.is_match(name)
}

/// Keep dining purchases only: the code must be the dining code and neither
/// the stall nor the cafeteria may look like a non-dining service.
pub fn clean_transactions(transactions: &[Transaction], dining_code: &str) -> Vec<Transaction> {
    let cleaned: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.code == dining_code && !is_non_dining(&t.stall) && !is_non_dining(&t.cafeteria))
        .cloned()
        .collect();
    tracing::info!(
        kept = cleaned.len(),
        total = transactions.len(),
        "cleaned transactions"
    );
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn raw(ts: &str, location: &str, merchant: &str, amount: i64, code: &str) -> RawTransaction {
        RawTransaction {
            timestamp: ts.to_string(),
            location: location.to_string(),
            merchant: merchant.to_string(),
            amount,
            balance: 10_000,
            code: code.to_string(),
            summary: None,
            name: None,
        }
    }

    #[test]
    fn backfills_placeholder_location_from_merchant_prefix() {
        let rows = vec![raw("2025-03-01 12:00:00", "-", "西区食堂_麻辣香锅", 1500, "1210")];
        let out = backfill_locations(&rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].location, "西区食堂");
        assert_eq!(out[0].merchant, "西区食堂_麻辣香锅");
    }

    #[test]
    fn drops_placeholder_without_merchant() {
        let rows = vec![
            raw("2025-03-01 12:00:00", "-", "", 1500, "1210"),
            raw("2025-03-01 12:10:00", "桃李园", "桃李园_面食", 800, "1210"),
        ];
        let out = backfill_locations(&rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].location, "桃李园");
    }

    #[test]
    fn merchant_without_underscore_becomes_location() {
        let rows = vec![raw("2025-03-01 12:00:00", "-", "清芬园", 900, "1210")];
        assert_eq!(backfill_locations(&rows)[0].location, "清芬园");
    }

    #[test]
    fn parses_timestamps_as_utc_plus_eight() {
        let at = parse_local_timestamp("2025-03-01 07:30:00").unwrap();
        assert_eq!(at.to_rfc3339(), "2025-03-01T07:30:00+08:00");
        let t = parse_local_timestamp("2025-03-01T07:30").unwrap();
        assert_eq!(t, at);
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let err = parse_local_timestamp("03/01/2025").unwrap_err();
        assert!(matches!(err, ReportError::InvalidTimestamp { .. }));
    }

    #[test]
    fn stamp_sorts_chronologically_and_keeps_ties_stable() {
        let rows = vec![
            raw("2025-03-02 12:00:00", "A", "a", 1, "1210"),
            raw("2025-03-01 12:00:00", "B", "b", 2, "1210"),
            raw("2025-03-01 12:00:00", "C", "c", 3, "1210"),
        ];
        let records = stamp_records(&rows).unwrap();
        let order: Vec<_> = records.iter().map(|r| r.raw.location.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
    }

    #[test]
    fn clean_drops_non_dining_names_and_codes() {
        let rows = vec![
            raw("2025-03-01 12:00:00", "西区食堂", "西区食堂_面食", 800, "1210"),
            raw("2025-03-01 12:05:00", "西区浴室", "西区_淋浴", 300, "1210"),
            raw("2025-03-01 12:06:00", "图书馆", "图书馆_复印", 100, "1210"),
            raw("2025-03-01 12:07:00", "西区食堂", "西区食堂_面食", 800, "1220"),
        ];
        let records = stamp_records(&rows).unwrap();
        let txns = create_transactions(&records);
        let cleaned = clean_transactions(&txns, "1210");
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].stall, "西区食堂_面食");
        assert_eq!(cleaned[0].amount, 800);
    }

    #[test]
    fn parses_envelope_and_bare_array() {
        let env = r#"{"resultData":{"rows":[{"txdate":"2025-03-01 12:00:00","meraddr":"A","mername":"A_1","txamt":500,"balance":100,"txcode":"1210"}],"total":1}}"#;
        let (rows, report) = parse_json(env).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(report.total_rows, 1);
        assert_eq!(rows[0].amount, 500);

        let arr = r#"[{"txdate":"2025-03-01 12:00:00","meraddr":"A","mername":"A_1","txamt":500,"balance":100,"txcode":"1210","summary":"持卡人消费"}]"#;
        let (rows, _) = parse_json(arr).unwrap();
        assert_eq!(rows[0].summary(), "持卡人消费");
        assert_eq!(rows[0].name(), "");
    }

    #[test]
    fn null_fields_read_as_empty() {
        let arr = r#"[
            {"txdate":"2025-03-01 12:00:00","meraddr":"-","mername":null,"txamt":500,"balance":null,"txcode":"1210","summary":null},
            {"txdate":"2025-03-01 12:30:00","meraddr":"A","mername":"A_1","txamt":300,"balance":100,"txcode":null}
        ]"#;
        let (rows, report) = parse_json(arr).unwrap();
        assert_eq!(report.total_rows, 2);
        assert_eq!(rows[0].merchant, "");
        assert_eq!(rows[0].balance, 0);
        assert_eq!(rows[0].summary, None);
        assert_eq!(rows[1].code, "");

        let kept = backfill_locations(&rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].location, "A");
    }

    #[test]
    fn bad_record_reports_its_own_error() {
        let arr = r#"[{"txdate":"2025-03-01 12:00:00","txamt":"five"}]"#;
        let err = parse_json(arr).unwrap_err();
        assert!(matches!(err, ReportError::Json(_)));
        assert!(!err.to_string().contains("untagged"));

        let env = r#"{"resultData":{"rows":[{"txamt":[]}]}}"#;
        assert!(matches!(parse_json(env).unwrap_err(), ReportError::Json(_)));
    }

    #[test]
    fn jsonl_skips_blank_lines() {
        let text = "{\"txdate\":\"2025-03-01 12:00:00\",\"meraddr\":\"A\",\"mername\":\"A_1\",\"txamt\":1,\"balance\":0,\"txcode\":\"1210\"}\n\n";
        let (rows, _) = parse_jsonl(text).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn loads_csv_and_counts_bad_rows() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "txdate,meraddr,mername,txamt,balance,txcode,summary,txname").unwrap();
        writeln!(file, "2025-03-01 12:00:00,A,A_1,500,9000,1210,,").unwrap();
        writeln!(file, "2025-03-01 12:30:00,A,A_2,abc,9000,1210,,").unwrap();
        file.flush().unwrap();
        let (rows, report) = load_raw(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.parse_errors, 1);
        assert_eq!(rows[0].summary, None);
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = load_raw(Path::new("dump.xlsx")).unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat { .. }));
    }
}
