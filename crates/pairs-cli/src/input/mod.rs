pub mod config;
pub mod file;
pub mod stdin;

use pairs_core::price_table::PriceTable;

/// Load the price table from `--input` (CSV or JSON) or piped JSON.
pub fn load_price_table(path: Option<&str>) -> Result<PriceTable, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        if file::is_csv(path) {
            return file::read_price_csv(path);
        }
        return file::read_json(path);
    }
    if let Some(data) = stdin::read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }
    Err("--input <prices.csv|prices.json> or a JSON price table on stdin is required".into())
}
