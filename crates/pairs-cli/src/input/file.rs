use chrono::NaiveDate;
use log::debug;
use pairs_core::price_table::{PriceObservation, PriceTable};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Read a JSON file into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: T = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(value)
}

pub fn is_csv(path: &str) -> bool {
    has_extension(path, &["csv"])
}

pub fn has_extension(path: &str, extensions: &[&str]) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Read a `date,<A>,<B>` CSV of aligned closes. The header names the legs.
pub fn read_price_csv(path: &str) -> Result<PriceTable, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let mut reader = csv::Reader::from_path(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let headers = reader.headers()?.clone();
    if headers.len() != 3 {
        return Err(format!(
            "'{}': expected header date,<A>,<B> but found {} columns",
            canonical.display(),
            headers.len()
        )
        .into());
    }
    let asset_a = headers[1].trim().to_string();
    let asset_b = headers[2].trim().to_string();

    let mut observations = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let row = line + 2;
        let date = NaiveDate::parse_from_str(record[0].trim(), DATE_FORMAT)
            .map_err(|e| format!("row {row}: bad date '{}': {e}", &record[0]))?;
        let price_a = parse_price(&record[1], row, &asset_a)?;
        let price_b = parse_price(&record[2], row, &asset_b)?;
        observations.push(PriceObservation {
            date,
            price_a,
            price_b,
        });
    }
    debug!(
        "read {} rows of {asset_a}/{asset_b} from {}",
        observations.len(),
        canonical.display()
    );

    Ok(PriceTable::new(asset_a, asset_b, observations))
}

fn parse_price(raw: &str, row: usize, asset: &str) -> Result<Decimal, Box<dyn std::error::Error>> {
    Decimal::from_str(raw.trim())
        .map_err(|e| format!("row {row}: bad {asset} price '{raw}': {e}").into())
}

/// Resolve the path against the working directory and check it is a file.
pub fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }
    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}
