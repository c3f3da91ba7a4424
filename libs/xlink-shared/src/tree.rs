use serde_json::Value;

/// Depth-first lookup of `key` anywhere below `data`.
///
/// Objects are walked in document order; for every entry the key itself is
/// compared before its value is descended into, so the first match wins.
/// Arrays are searched element by element. Scalars never match.
pub fn search_key<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    match data {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key {
                    return Some(v);
                }
                if let Some(found) = search_key(v, key) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| search_key(item, key)),
        _ => None,
    }
}

/// Finds a `Host` header inside a headers object, ignoring key case.
///
/// The header may be a plain string or a list, in which case the first
/// element is used.
pub fn search_host(headers: Option<&Value>) -> Option<String> {
    let map = headers?.as_object()?;
    let (_, value) = map.iter().find(|(k, _)| k.eq_ignore_ascii_case("host"))?;
    match value {
        Value::String(host) => Some(host.clone()),
        Value::Array(hosts) => hosts.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
