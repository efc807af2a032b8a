//! Fixture files: canned response envelopes keyed by name.
//!
//! ```yaml
//! # <fixture root>/github/repository.yml
//! rails:
//!   data:
//!     repository:
//!       name: rails
//!       nameWithOwner: rails/rails
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::config::expand_env_vars;
use crate::error::{Error, Result};
use crate::inflect::{operation_slug, service_slug};

const EXTENSIONS: [&str; 3] = ["yml", "yaml", "json"];

/// The fixtures of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureSet {
    name: String,
    path: PathBuf,
    data: Map<String, Value>,
}

impl FixtureSet {
    /// Read and parse one fixture file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let source = expand_env_vars(&source)?;

        let value: Value = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                serde_json::from_str(&source).map_err(|e| Error::parse(path, e.to_string()))?
            }
            _ => serde_yaml::from_str(&source).map_err(|e| Error::parse(path, e.to_string()))?,
        };
        let data = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(Error::parse(path, "fixture file must be a mapping")),
        };

        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .ok_or_else(|| Error::parse(path, "fixture file has no name"))?;

        Ok(Self {
            name,
            path: path.to_path_buf(),
            data,
        })
    }

    /// File stem; the operation the fixtures answer.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// The fixture under `key`, or `FixtureNotFound`.
    pub fn fixture(&self, key: &str) -> Result<&Value> {
        self.get(key).ok_or_else(|| {
            Error::FixtureNotFound(format!(
                "Fixture `{key}` not found in {}",
                self.path.display()
            ))
        })
    }

    fn in_service_dir(&self, service: &str) -> bool {
        self.path
            .parent()
            .and_then(|dir| dir.file_name())
            .and_then(|dir| dir.to_str())
            .is_some_and(|dir| dir == service)
    }
}

/// Every fixture file under a root, read on first use.
#[derive(Debug)]
pub struct FixtureLibrary {
    root: Option<PathBuf>,
    sets: Mutex<Option<Arc<Vec<FixtureSet>>>>,
}

impl FixtureLibrary {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            sets: Mutex::new(None),
        }
    }

    pub fn root(&self) -> Result<&Path> {
        self.root
            .as_deref()
            .ok_or_else(|| Error::Configuration("GraphQL fixture path is unset".into()))
    }

    /// All fixture sets, sorted by path.
    pub fn sets(&self) -> Result<Arc<Vec<FixtureSet>>> {
        let root = self.root()?;
        let mut cached = self.sets.lock();
        if let Some(sets) = cached.as_ref() {
            return Ok(Arc::clone(sets));
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| EXTENSIONS.contains(&ext))
            })
            .collect();
        paths.sort();

        let sets = paths
            .iter()
            .map(|path| FixtureSet::load(path))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            target: "switchyard::testing",
            root = %root.display(),
            files = sets.len(),
            "loaded fixture files"
        );

        let sets = Arc::new(sets);
        *cached = Some(Arc::clone(&sets));
        Ok(sets)
    }

    /// The fixture set for `service`'s `operation`.
    ///
    /// A file in the service's own directory wins over one found elsewhere.
    pub fn find(&self, service: &str, operation: &str) -> Result<FixtureSet> {
        let root = self.root()?;
        let sets = self.sets()?;
        let name = operation_slug(operation);
        let service = service_slug(service);

        let mut candidates = sets.iter().filter(|set| set.name == name);
        let first = candidates.clone().next();
        candidates
            .find(|set| set.in_service_dir(&service))
            .or(first)
            .cloned()
            .ok_or_else(|| {
                Error::FixtureNotFound(format!(
                    "Fixture file `{}` not found",
                    root.join(format!("{name}.{{yml,json}}")).display()
                ))
            })
    }

    /// Forget the cached files; the next lookup reads them again.
    pub fn clear(&self) {
        *self.sets.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_yaml_and_json_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "github/repository.yml",
            "rails:\n  data:\n    repository:\n      name: rails\n",
        );
        write(
            dir.path(),
            "github/user.json",
            r#"{"octocat": {"data": {"user": {"login": "octocat"}}}}"#,
        );
        write(dir.path(), "github/README.md", "ignored");

        let library = FixtureLibrary::new(Some(dir.path().to_path_buf()));
        assert_eq!(library.sets().unwrap().len(), 2);

        let repository = library.find("Github", "repository").unwrap();
        assert_eq!(
            repository.fixture("rails").unwrap(),
            &json!({"data": {"repository": {"name": "rails"}}})
        );

        let user = library.find("github", "user").unwrap();
        assert_eq!(user.keys().collect::<Vec<_>>(), vec!["octocat"]);
    }

    #[test]
    fn test_service_directory_wins() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "github/repository.yml", "from_github: {data: {}}\n");
        write(
            dir.path(),
            "spotify_client/repository.yml",
            "from_spotify: {data: {}}\n",
        );

        let library = FixtureLibrary::new(Some(dir.path().to_path_buf()));
        let spotify = library.find("SpotifyClient", "repository").unwrap();
        assert!(spotify.get("from_spotify").is_some());
        let github = library.find("Github", "repository").unwrap();
        assert!(github.get("from_github").is_some());

        // No directory for this service: first file by path.
        let other = library.find("Gitlab", "repository").unwrap();
        assert!(other.get("from_github").is_some());
    }

    #[test]
    fn test_env_placeholders_expanded() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "github/repository.yml",
            "crate:\n  data:\n    repository:\n      name: ${CARGO_PKG_NAME}\n",
        );

        let set = FixtureSet::load(&dir.path().join("github/repository.yml")).unwrap();
        assert_eq!(
            set.fixture("crate").unwrap()["data"]["repository"]["name"],
            json!("switchyard")
        );
    }

    #[test]
    fn test_escaped_placeholder_in_other_fixture() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "github/template.yml",
            "raw:\n  data:\n    body: \"Hello $${USER_NAME_NOT_SET_HERE}\"\n",
        );
        write(dir.path(), "github/repository.yml", "rails: {data: {}}\n");
        let library = FixtureLibrary::new(Some(dir.path().to_path_buf()));

        assert!(library.find("github", "repository").is_ok());
        let template = library.find("github", "template").unwrap();
        assert_eq!(
            template.fixture("raw").unwrap()["data"]["body"],
            json!("Hello ${USER_NAME_NOT_SET_HERE}")
        );
    }

    #[test]
    fn test_missing_file_and_key() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "github/repository.yml", "rails: {data: {}}\n");
        let library = FixtureLibrary::new(Some(dir.path().to_path_buf()));

        let err = library.find("github", "does_not_exist").unwrap_err();
        assert!(matches!(err, Error::FixtureNotFound(_)));
        assert!(err.to_string().contains("does_not_exist.{yml,json}"), "{err}");

        let set = library.find("github", "repository").unwrap();
        let err = set.fixture("nope").unwrap_err();
        assert!(err.to_string().contains("github/repository.yml"), "{err}");
    }

    #[test]
    fn test_unset_root() {
        let library = FixtureLibrary::new(None);
        let err = library.find("github", "repository").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: GraphQL fixture path is unset"
        );
    }

    #[test]
    fn test_sets_cached_until_cleared() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "github/repository.yml", "rails: {data: {}}\n");
        let library = FixtureLibrary::new(Some(dir.path().to_path_buf()));

        let first = library.sets().unwrap();
        write(dir.path(), "github/user.yml", "octocat: {data: {}}\n");
        assert!(Arc::ptr_eq(&first, &library.sets().unwrap()));

        library.clear();
        assert_eq!(library.sets().unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "github/broken.json", "[1, 2]");
        let library = FixtureLibrary::new(Some(dir.path().to_path_buf()));
        assert!(matches!(library.sets(), Err(Error::Parse { .. })));
    }
}
