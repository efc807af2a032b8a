//! Request context threaded through every call.
//!
//! A [`Context`] is an ordered key/value bag. Two keys carry meaning for the
//! transport layer: `headers` (a map of header name to value, sent on every
//! HTTP request) and `url` (the routing target read by the multi-domain
//! router). Everything else is opaque application metadata that callbacks
//! and the test adapter observe.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key holding per-request HTTP headers.
pub const HEADERS_KEY: &str = "headers";

/// Key holding the routing URL used by the multi-domain router.
pub const URL_KEY: &str = "url";

/// A deep-mergeable request context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Map<String, Value>);

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder-style header insert. Later values for the same name win.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let headers = self
            .0
            .entry(HEADERS_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if !headers.is_object() {
            *headers = Value::Object(Map::new());
        }
        if let Value::Object(map) = headers {
            map.insert(name.into(), Value::String(value.into()));
        }
        self
    }

    /// Builder-style routing URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.insert(URL_KEY, url.into());
        self
    }

    /// Insert a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether the context has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The routing URL, if one is set and is a string.
    pub fn routing_url(&self) -> Option<&str> {
        self.0.get(URL_KEY).and_then(Value::as_str)
    }

    /// Headers as name/value pairs.
    ///
    /// String values are sent verbatim, numbers and booleans are rendered,
    /// `null` entries are skipped and nested structures are sent as JSON text.
    pub fn headers(&self) -> Vec<(String, String)> {
        let Some(Value::Object(headers)) = self.0.get(HEADERS_KEY) else {
            return Vec::new();
        };
        headers
            .iter()
            .filter_map(|(name, value)| {
                let value = match value {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some((name.clone(), value))
            })
            .collect()
    }

    /// Return a new context with `other` deep-merged over `self`.
    ///
    /// Nested maps merge key by key; every other value in `other` replaces
    /// the one in `self` wholesale.
    pub fn deep_merge(&self, other: &Context) -> Context {
        let mut merged = self.0.clone();
        deep_merge_into(&mut merged, &other.0);
        Context(merged)
    }

    /// Merge layers in increasing precedence order.
    pub fn merge_layers<'a>(layers: impl IntoIterator<Item = &'a Context>) -> Context {
        let mut merged = Map::new();
        for layer in layers {
            deep_merge_into(&mut merged, &layer.0);
        }
        Context(merged)
    }
}

fn deep_merge_into(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge_into(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

impl From<Map<String, Value>> for Context {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Object values become the context; any other value yields an empty one.
impl From<Value> for Context {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_merge_nested_maps() {
        let base = Context::from(json!({"headers": {"Authorization": "token a"}, "user_id": 1}));
        let overlay = Context::from(json!({"headers": {"X-Request-Id": "r1"}, "user_id": 2}));

        let merged = base.deep_merge(&overlay);
        assert_eq!(
            merged.as_map(),
            json!({
                "headers": {"Authorization": "token a", "X-Request-Id": "r1"},
                "user_id": 2
            })
            .as_object()
            .unwrap()
        );
    }

    #[test]
    fn test_non_map_replaces_wholesale() {
        let base = Context::from(json!({"headers": {"A": "1"}}));
        let overlay = Context::from(json!({"headers": "none"}));
        assert_eq!(base.deep_merge(&overlay).get("headers"), Some(&json!("none")));
    }

    #[test]
    fn test_merge_layers_precedence() {
        let default = Context::new().header("Authorization", "default").with("a", 1);
        let instance = Context::new().header("Authorization", "instance").with("b", 2);
        let call = Context::new().with("a", 3);

        let merged = Context::merge_layers([&default, &instance, &call]);
        assert_eq!(merged.get("a"), Some(&json!(3)));
        assert_eq!(merged.get("b"), Some(&json!(2)));
        assert_eq!(
            merged.headers(),
            vec![("Authorization".to_string(), "instance".to_string())]
        );
    }

    #[test]
    fn test_merge_is_associative() {
        let a = Context::from(json!({"x": {"y": 1}, "k": "a"}));
        let b = Context::from(json!({"x": {"z": 2}}));
        let c = Context::from(json!({"x": {"y": 3}, "k": "c"}));

        let left = a.deep_merge(&b).deep_merge(&c);
        let right = a.deep_merge(&b.deep_merge(&c));
        assert_eq!(left, right);
        assert_eq!(left, Context::merge_layers([&a, &b, &c]));
    }

    #[test]
    fn test_headers_rendering() {
        let ctx = Context::from(json!({
            "headers": {"X-Num": 3, "X-Flag": true, "X-Skip": null, "X-Str": "v"}
        }));
        let mut headers = ctx.headers();
        headers.sort();
        assert_eq!(
            headers,
            vec![
                ("X-Flag".to_string(), "true".to_string()),
                ("X-Num".to_string(), "3".to_string()),
                ("X-Str".to_string(), "v".to_string()),
            ]
        );
    }

    #[test]
    fn test_routing_url() {
        assert_eq!(Context::new().routing_url(), None);
        let ctx = Context::new().url("https://a.example/graphql");
        assert_eq!(ctx.routing_url(), Some("https://a.example/graphql"));
        assert_eq!(Context::from(json!({"url": 5})).routing_url(), None);
    }

    #[test]
    fn test_from_non_object_is_empty() {
        assert!(Context::from(json!([1, 2])).is_empty());
    }
}
