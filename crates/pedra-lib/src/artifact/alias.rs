//! First-present-key lookup over alternate artifact field names

use serde_json::{Map, Value};

/// Ordered list of keys under which one concept may be stored
#[derive(Debug, Clone, Copy)]
pub struct AliasSet {
    pub concept: &'static str,
    pub keys: &'static [&'static str],
}

impl AliasSet {
    pub const fn new(concept: &'static str, keys: &'static [&'static str]) -> Self {
        Self { concept, keys }
    }

    /// Value of the first key holding something meaningful
    ///
    /// Null, empty strings, empty arrays and empty objects count as absent.
    pub fn lookup<'a>(&self, map: &'a Map<String, Value>) -> Option<&'a Value> {
        self.keys
            .iter()
            .filter_map(|key| map.get(*key))
            .find(|value| is_present(value))
    }

    /// Same as [`lookup`](Self::lookup) but reports which key matched
    pub fn lookup_key<'a>(&self, map: &'a Map<String, Value>) -> Option<(&'static str, &'a Value)> {
        self.keys
            .iter()
            .filter_map(|key| map.get(*key).map(|v| (*key, v)))
            .find(|(_, value)| is_present(value))
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

pub const MODEL_KEYS: AliasSet = AliasSet::new("model", &["modelo", "model", "pipeline"]);
pub const IMPUTER_KEYS: AliasSet = AliasSet::new("imputer", &["imputer"]);
pub const SCALER_KEYS: AliasSet = AliasSet::new("scaler", &["scaler"]);
pub const FEATURE_KEYS: AliasSet = AliasSet::new("features", &["features", "features_list"]);
pub const CLASS_MAP_KEYS: AliasSet =
    AliasSet::new("class map", &["mapa_classes", "mapa_pedras", "map_classes"]);
pub const VERSION_KEYS: AliasSet = AliasSet::new("version", &["versao", "version"]);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_first_present_key_wins() {
        let map = object(json!({"model": {"kind": "a"}, "pipeline": {"kind": "b"}}));
        assert_eq!(MODEL_KEYS.lookup(&map), Some(&json!({"kind": "a"})));
        assert_eq!(MODEL_KEYS.lookup_key(&map).map(|(k, _)| k), Some("model"));
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let map = object(json!({"modelo": null, "model": {}, "pipeline": {"kind": "b"}}));
        assert_eq!(MODEL_KEYS.lookup_key(&map).map(|(k, _)| k), Some("pipeline"));

        let map = object(json!({"versao": "", "version": 3}));
        assert_eq!(VERSION_KEYS.lookup(&map), Some(&json!(3)));

        let map = object(json!({"features": []}));
        assert!(FEATURE_KEYS.lookup(&map).is_none());
    }
}
