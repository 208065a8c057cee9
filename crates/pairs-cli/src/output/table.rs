use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::ROW_KEYS;

/// Arrays longer than this are summarised instead of printed inline.
const MAX_INLINE_ITEMS: usize = 8;

/// Field/value table of the result, a trade table, then warnings.
pub fn print_table(value: &Value) {
    let Value::Object(envelope) = value else {
        println!("{}", value);
        return;
    };
    let Some(Value::Object(result)) = envelope.get("result") else {
        print_fields(envelope);
        return;
    };

    print_fields(result);

    for key in ROW_KEYS {
        if let Some(Value::Array(rows)) = result.get(key) {
            if !rows.is_empty() {
                println!("\n{}:", key);
                print_rows(rows);
            }
        }
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut fields = Vec::new();
    flatten("", map, &mut fields);
    for (key, val) in fields {
        builder.push_record([key, val]);
    }
    println!("{}", Table::from(builder));
}

/// Nested objects become dotted keys; row arrays get their own table.
fn flatten(prefix: &str, map: &Map<String, Value>, out: &mut Vec<(String, String)>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) => flatten(&name, inner, out),
            Value::Array(rows) if ROW_KEYS.contains(&key.as_str()) => {
                out.push((name, format!("{} rows (below)", rows.len())));
            }
            _ => out.push((name, format_value(val))),
        }
    }
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        return;
    };
    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for row in rows {
        if let Value::Object(map) = row {
            let cells: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(cells);
        }
    }
    println!("{}", Table::from(builder));
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) if arr.len() > MAX_INLINE_ITEMS => format!("[{} values]", arr.len()),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_result() {
        let result = json!({
            "pnl": "1.986",
            "hedge_ratio": { "beta": "2", "r_squared": "0.9" },
            "closed_trades": [{ "entry_index": 30 }],
            "equity_curve": ["1", "2", "3", "4", "5", "6", "7", "8", "9"],
        });
        let mut out = Vec::new();
        flatten("", result.as_object().unwrap(), &mut out);
        assert!(out.contains(&("hedge_ratio.beta".to_string(), "2".to_string())));
        assert!(out.contains(&("closed_trades".to_string(), "1 rows (below)".to_string())));
        assert!(out.contains(&("equity_curve".to_string(), "[9 values]".to_string())));
    }
}
