use serde_json::Value;

fn is_valid_short_id(id: &str) -> bool {
    let len = id.len();
    (8..=16).contains(&len) && len % 2 == 0 && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// Keeps the candidates Reality clients accept as short ids: 8 to 16 hex
/// characters of even length after trimming. Results are lower-cased and
/// de-duplicated, in input order. Non-string entries are ignored.
pub fn normalize_short_ids(values: &[Value]) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let Some(raw) = value.as_str() else {
            continue;
        };
        let id = raw.trim();
        if !is_valid_short_id(id) {
            continue;
        }
        let normalized = id.to_ascii_lowercase();
        if !result.contains(&normalized) {
            result.push(normalized);
        }
    }
    result
}

pub fn first_short_id(values: &[Value]) -> Option<String> {
    normalize_short_ids(values).into_iter().next()
}
