//! Normalization of client-supplied part lists.

use std::collections::BTreeMap;

use serde_json::Value;

use parcel_model::input::SubmittedPart;
use parcel_model::{MAX_PART_NUMBER, PartDescriptor};

/// Read a part number from a JSON number, a numeric string, or an object
/// carrying one under `number`, `partNumber` or `PartNumber`.
///
/// Returns `None` for anything outside `1..=10000`.
#[must_use]
pub fn parse_part_number(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        Value::Object(map) => {
            return ["number", "partNumber", "PartNumber", "part_number"]
                .iter()
                .find_map(|name| map.get(*name))
                .and_then(parse_part_number);
        }
        _ => return None,
    };
    u32::try_from(n)
        .ok()
        .filter(|n| (1..=MAX_PART_NUMBER).contains(n))
}

/// Turn a completion request into the list the store expects.
///
/// Entries without a valid number or a non-empty ETag are dropped. When a
/// part number repeats, the last entry wins. The result is ascending.
#[must_use]
pub fn normalize_completion(submitted: &[SubmittedPart]) -> Vec<PartDescriptor> {
    let mut parts = BTreeMap::new();
    for entry in submitted {
        let Some(number) = entry.part_number.as_ref().and_then(parse_part_number) else {
            continue;
        };
        let Some(e_tag) = entry.e_tag.as_ref().and_then(e_tag_of) else {
            continue;
        };
        parts.insert(number, e_tag);
    }
    parts
        .into_iter()
        .map(|(number, e_tag)| PartDescriptor::new(number, e_tag))
        .collect()
}

fn e_tag_of(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn submitted(value: Value) -> Vec<SubmittedPart> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_should_parse_part_number_shapes() {
        let cases = [
            (json!(1), Some(1)),
            (json!("7"), Some(7)),
            (json!(" 12 "), Some(12)),
            (json!({"number": 3}), Some(3)),
            (json!({"PartNumber": "4"}), Some(4)),
            (json!(10_000), Some(10_000)),
            (json!(0), None),
            (json!(10_001), None),
            (json!(-1), None),
            (json!(1.5), None),
            (json!("abc"), None),
            (json!(null), None),
            (json!({"other": 1}), None),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_part_number(&input), expected, "{input}");
        }
    }

    #[test]
    fn test_should_sort_parts_ascending() {
        let parts = normalize_completion(&submitted(json!([
            {"PartNumber": 3, "ETag": "\"c\""},
            {"PartNumber": 1, "ETag": "\"a\""},
            {"PartNumber": 2, "ETag": "\"b\""},
        ])));
        let numbers: Vec<u32> = parts.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_should_keep_last_duplicate() {
        let parts = normalize_completion(&submitted(json!([
            {"partNumber": 1, "eTag": "\"old\""},
            {"number": "1", "etag": "\"new\""},
        ])));
        assert_eq!(parts, vec![PartDescriptor::new(1, "\"new\"")]);
    }

    #[test]
    fn test_should_drop_invalid_entries() {
        let parts = normalize_completion(&submitted(json!([
            {"PartNumber": 0, "ETag": "\"a\""},
            {"PartNumber": 2, "ETag": ""},
            {"PartNumber": 3},
            {"ETag": "\"d\""},
            {"PartNumber": "x", "ETag": "\"e\""},
            {"PartNumber": 5, "ETag": "\"f\""},
        ])));
        assert_eq!(parts, vec![PartDescriptor::new(5, "\"f\"")]);
    }
}
