use serde_json::Value;

/// Headline field of each command, most specific first.
const PRIORITY_KEYS: [&str; 7] = [
    "decision",
    "signal",
    "pnl",
    "is_cointegrated",
    "latest_z_score",
    "beta",
    "z_score",
];

/// Print just the key answer of the result.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
                return format_minimal(val);
            }
        }
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_minimal(val));
        }
    }

    format_minimal(result_obj)
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        // ZScore: {"status": "defined", "value": "1.2"}
        Value::Object(map) => match (map.get("value"), map.get("status")) {
            (Some(v), _) => format_minimal(v),
            (None, Some(status)) => format_minimal(status),
            _ => serde_json::to_string(value).unwrap_or_default(),
        },
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decision_beats_signal() {
        let v = json!({"result": {"decision": "avoid", "signal": {"signal": "HOLD"}}});
        assert_eq!(minimal_line(&v), "avoid");
    }

    #[test]
    fn test_signal_string() {
        let v = json!({"result": {"z_score": "-2.3", "signal": "BUY"}});
        assert_eq!(minimal_line(&v), "BUY");
    }

    #[test]
    fn test_undefined_z_prints_status() {
        let v = json!({"result": {"latest_z_score": {"status": "zero_variance"}}});
        assert_eq!(minimal_line(&v), "zero_variance");
    }
}
