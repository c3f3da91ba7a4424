use serde_json::{Map, Value};

/// Keys that only make sense alongside a TLS identity.
pub const TLS_IDENTITY_KEYS: [&str; 4] = ["alpn", "sni", "fp", "allowInsecure"];

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Int(i64),
}

impl ParamValue {
    fn to_query_string(&self) -> String {
        match self {
            ParamValue::Text(s) => s.clone(),
            ParamValue::Int(n) => n.to_string(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            ParamValue::Text(s) => Value::String(s.clone()),
            ParamValue::Int(n) => Value::from(*n),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<&String> for ParamValue {
    fn from(s: &String) -> Self {
        ParamValue::Text(s.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Int(n)
    }
}

impl From<u16> for ParamValue {
    fn from(n: u16) -> Self {
        ParamValue::Int(n.into())
    }
}

/// Ordered key/value pairs shared by the JSON and query-string encodings.
///
/// Setting an existing key replaces its value in place. Both serializers
/// emit keys sorted, so output never depends on insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    entries: Vec<(String, ParamValue)>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn set_opt(&mut self, key: &str, value: Option<&String>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    #[cfg(test)]
    pub(crate) fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[cfg(test)]
    pub(crate) fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(ParamValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove_all(&mut self, keys: &[&str]) {
        self.entries.retain(|(k, _)| !keys.contains(&k.as_str()));
    }

    fn sorted(&self) -> Vec<&(String, ParamValue)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// `application/x-www-form-urlencoded` query, keys sorted.
    pub fn to_query(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.sorted() {
            serializer.append_pair(key, &value.to_query_string());
        }
        serializer.finish()
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (key, value) in self.sorted() {
            map.insert(key.clone(), value.to_json());
        }
        Value::Object(map)
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.to_json()).unwrap_or_default()
    }
}
