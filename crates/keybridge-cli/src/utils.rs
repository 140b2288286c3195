use serde_json::{Map, Value};

// Strips nulls and empty objects so unset CLI options fall through to
// the config file and serde defaults during the figment merge.
pub fn clean_json(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let cleaned_map: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| {
                    let cleaned_v = clean_json(v);
                    if cleaned_v.is_null()
                        || (cleaned_v.is_object() && cleaned_v.as_object().unwrap().is_empty())
                    {
                        None
                    } else {
                        Some((k, cleaned_v))
                    }
                })
                .collect();
            Value::Object(cleaned_map)
        }
        Value::Array(arr) => {
            let cleaned_arr = arr.into_iter().map(clean_json).collect();
            Value::Array(cleaned_arr)
        }
        _ => value,
    }
}
