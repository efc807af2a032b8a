//! Name casing shared by the operation store, registry and stubs.

use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use serde_json::{Map, Value};

/// Directory and registry key for a service: `SpotifyClient` -> `spotify_client`.
pub fn service_slug(service: &str) -> String {
    service.to_snake_case()
}

/// File stem for an operation: `userRepositories` -> `user_repositories`.
pub fn operation_slug(operation: &str) -> String {
    operation.to_snake_case()
}

/// Type-style name of a service: `spotify_client` -> `SpotifyClient`.
pub fn type_name(service: &str) -> String {
    service.to_upper_camel_case()
}

/// `Github` + `user_repositories` -> `Github__UserRepositories`.
pub fn namespaced(service: &str, operation: &str) -> String {
    format!("{}__{}", type_name(service), operation.to_upper_camel_case())
}

/// Recursively rewrite object keys to lowerCamelCase.
pub fn camelize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(camelize_map(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(camelize_keys).collect()),
        other => other,
    }
}

/// [`camelize_keys`] for a map.
pub fn camelize_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| (key.to_lower_camel_case(), camelize_keys(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slugs() {
        assert_eq!(service_slug("Github"), "github");
        assert_eq!(service_slug("SpotifyClient"), "spotify_client");
        assert_eq!(operation_slug("UserRepositories"), "user_repositories");
        assert_eq!(operation_slug("userRepositories"), "user_repositories");
        assert_eq!(operation_slug("user_repositories"), "user_repositories");
    }

    #[test]
    fn test_namespaced() {
        assert_eq!(namespaced("Github", "repository"), "Github__Repository");
        assert_eq!(namespaced("github", "user_repositories"), "Github__UserRepositories");
        assert_eq!(namespaced("SpotifyClient", "Artist"), "SpotifyClient__Artist");
    }

    #[test]
    fn test_camelize_nested() {
        let value = camelize_keys(json!({
            "first_name": "a",
            "owner": {"repo_name": "b", "items": [{"node_id": 1}]},
            "alreadyCamel": true
        }));
        assert_eq!(
            value,
            json!({
                "firstName": "a",
                "owner": {"repoName": "b", "items": [{"nodeId": 1}]},
                "alreadyCamel": true
            })
        );
    }
}
