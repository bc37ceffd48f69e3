use serde::Serialize;
use serde_json::Value;

use crate::utils::error::Result;

/// Serializes a request body in field declaration order without whitespace.
/// The returned string is both the hashed and the transmitted payload.
pub fn to_payload<T: Serialize>(body: &T) -> Result<String> {
    Ok(serde_json::to_string(body)?)
}

/// Navigates through a JSON structure using a path array
/// Returns all matching values at the end of the path
/// Supports "[*]" for array iteration and "[0]"-style indices
pub fn navigate_json_path<'a>(current: &'a Value, path: &[&str]) -> Vec<&'a Value> {
    let Some((segment, remaining_path)) = path.split_first() else {
        return vec![current];
    };

    match *segment {
        "[*]" => current
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .flat_map(|item| navigate_json_path(item, remaining_path))
                    .collect()
            })
            .unwrap_or_default(),
        indexed if indexed.starts_with('[') && indexed.ends_with(']') => indexed[1..indexed.len() - 1]
            .parse::<usize>()
            .ok()
            .and_then(|index| current.get(index))
            .map(|item| navigate_json_path(item, remaining_path))
            .unwrap_or_default(),
        field_name => current
            .get(field_name)
            .map(|field_value| navigate_json_path(field_value, remaining_path))
            .unwrap_or_default(),
    }
}

/// First non-blank string at `path`, trimmed
pub fn json_path_str(json: &Value, path: &[&str]) -> Option<String> {
    navigate_json_path(json, path)
        .into_iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
