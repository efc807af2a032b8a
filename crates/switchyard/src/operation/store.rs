//! File lookup and caching for operation definitions.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use apollo_compiler::ast;
use parking_lot::{Mutex, RwLock};

use super::OperationDefinition;
use super::document::{self, ParsedFile};
use crate::error::{Error, Result};
use crate::inflect::{namespaced, operation_slug, service_slug, type_name};

/// Operation names ending in this marker may live in `_<name>.graphql`
/// when fragment files are enabled.
pub const FRAGMENT_SUFFIX: &str = "_fragment";

type Key = (String, String);
type Slot = Arc<Mutex<Option<Arc<ParsedFile>>>>;

/// An assembled definition and the slugs of the fragments pulled in from
/// other files.
struct Cached {
    definition: Arc<OperationDefinition>,
    fragments: HashSet<String>,
}

fn key(client: &str, operation: &str) -> Key {
    (service_slug(client), operation_slug(operation))
}

// Fragment lookups may resolve to a different file than an operation of
// the same name, so their parsed files are cached apart.
fn fragment_key(client: &str, fragment: &str) -> Key {
    (service_slug(client), format!("#{}", operation_slug(fragment)))
}

/// Loads operation files on demand and caches both parsed files and
/// assembled definitions.
///
/// A file is read at most once per cache generation. Concurrent loads of
/// the same operation wait on a per-file slot, and the finished
/// definition is inserted with first-writer-wins so every caller ends up
/// with the same `Arc`. Reloading a file also drops every cached
/// definition that spread a fragment from it.
pub struct OperationStore {
    roots: Vec<PathBuf>,
    fragment_files: bool,
    files: Mutex<HashMap<Key, Slot>>,
    definitions: RwLock<HashMap<Key, Cached>>,
}

impl OperationStore {
    /// Create a store searching `roots` in order.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            fragment_files: false,
            files: Mutex::new(HashMap::new()),
            definitions: RwLock::new(HashMap::new()),
        }
    }

    /// Accept `_name.graphql` for names ending in [`FRAGMENT_SUFFIX`].
    pub fn with_fragment_files(mut self, enabled: bool) -> Self {
        self.fragment_files = enabled;
        self
    }

    pub fn query_paths(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn fragment_files(&self) -> bool {
        self.fragment_files
    }

    fn file_names(&self, operation: &str) -> Vec<String> {
        let slug = operation_slug(operation);
        let mut names = vec![format!("{slug}.graphql")];
        if self.fragment_files
            && let Some(stem) = slug.strip_suffix(FRAGMENT_SUFFIX)
        {
            names.push(format!("_{stem}.graphql"));
        }
        names
    }

    fn candidates(&self, client: &str, operation: &str) -> Vec<PathBuf> {
        let dir = service_slug(client);
        let names = self.file_names(operation);
        self.roots
            .iter()
            .flat_map(|root| {
                let dir = root.join(&dir);
                names.iter().map(move |name| dir.join(name))
            })
            .collect()
    }

    /// First existing file for the operation, searching roots in order.
    pub fn resolve(&self, client: &str, operation: &str) -> Option<PathBuf> {
        self.candidates(client, operation)
            .into_iter()
            .find(|path| path.is_file())
    }

    fn resolve_fragment(&self, client: &str, fragment: &str) -> Option<PathBuf> {
        self.resolve(client, fragment).or_else(|| {
            if self.fragment_files {
                self.resolve(client, &format!("{}{FRAGMENT_SUFFIX}", operation_slug(fragment)))
            } else {
                None
            }
        })
    }

    fn not_found(&self, client: &str, operation: &str) -> Error {
        let searched = self
            .candidates(client, operation)
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Error::OperationNotFound {
            client: type_name(client),
            operation: operation.to_string(),
            searched,
        }
    }

    /// All `.graphql` files in the service's directories, sorted per root.
    pub fn graphql_file_paths(&self, client: &str) -> Vec<PathBuf> {
        let dir = service_slug(client);
        let mut paths = Vec::new();

        for root in &self.roots {
            let Ok(entries) = std::fs::read_dir(root.join(&dir)) else {
                continue;
            };
            let mut found: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| {
                    path.is_file() && path.extension().is_some_and(|ext| ext == "graphql")
                })
                .collect();
            found.sort();
            paths.extend(found);
        }
        paths
    }

    /// Load (or return the cached) definition for `client`/`operation`.
    pub fn load(&self, client: &str, operation: &str) -> Result<Arc<OperationDefinition>> {
        let key = key(client, operation);
        if let Some(cached) = self.definitions.read().get(&key) {
            tracing::trace!(target: "switchyard::operation", operation = %cached.definition.name(), "cache hit");
            return Ok(Arc::clone(&cached.definition));
        }

        let root = self.parsed_file(client, operation, false)?;
        let (definition, fragments) = self.assemble(client, &root)?;

        let mut definitions = self.definitions.write();
        let cached = definitions.entry(key).or_insert_with(|| Cached {
            definition: Arc::new(definition),
            fragments,
        });
        Ok(Arc::clone(&cached.definition))
    }

    /// Cached definition, if one has been loaded.
    pub fn cached(&self, client: &str, operation: &str) -> Option<Arc<OperationDefinition>> {
        self.definitions
            .read()
            .get(&key(client, operation))
            .map(|cached| Arc::clone(&cached.definition))
    }

    /// Drop the cached copy and read the file again.
    ///
    /// Cached definitions of the same service that spread a fragment from
    /// this file are dropped too and reassembled on their next load.
    pub fn reload(&self, client: &str, operation: &str) -> Result<Arc<OperationDefinition>> {
        let key = key(client, operation);
        let slug = key.1.clone();
        // `_name.graphql` is spread as `name` but loaded as `name_fragment`.
        let mut names = vec![slug.clone()];
        if let Some(stem) = slug.strip_suffix(FRAGMENT_SUFFIX) {
            names.push(stem.to_string());
        }

        {
            let mut files = self.files.lock();
            files.remove(&key);
            for name in &names {
                files.remove(&fragment_key(client, name));
            }
        }
        {
            let mut definitions = self.definitions.write();
            let before = definitions.len();
            definitions.retain(|cached_key, cached| {
                *cached_key != key
                    && (cached_key.0 != key.0
                        || !names.iter().any(|name| cached.fragments.contains(name)))
            });
            tracing::debug!(
                target: "switchyard::operation",
                client,
                operation,
                evicted = before - definitions.len(),
                "reloading operation"
            );
        }
        self.load(client, operation)
    }

    pub fn clear(&self) {
        self.files.lock().clear();
        self.definitions.write().clear();
    }

    /// Load every operation file found for `client`.
    ///
    /// Underscore-prefixed files are only treated as operations when
    /// fragment files are enabled, under their `_fragment` name.
    pub fn preload(&self, client: &str) -> Result<Vec<Arc<OperationDefinition>>> {
        let mut loaded = Vec::new();

        for path in self.graphql_file_paths(client) {
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let name = match stem.strip_prefix('_') {
                Some(partial) if self.fragment_files => format!("{partial}{FRAGMENT_SUFFIX}"),
                Some(_) => continue,
                None => stem.to_string(),
            };
            loaded.push(self.load(client, &name)?);
        }

        tracing::debug!(
            target: "switchyard::operation",
            client,
            count = loaded.len(),
            "preloaded operations"
        );
        Ok(loaded)
    }

    fn parsed_file(&self, client: &str, name: &str, fragment: bool) -> Result<Arc<ParsedFile>> {
        let slot_key = if fragment {
            fragment_key(client, name)
        } else {
            key(client, name)
        };
        let slot = Arc::clone(self.files.lock().entry(slot_key).or_default());
        let mut guard = slot.lock();
        if let Some(parsed) = guard.as_ref() {
            return Ok(Arc::clone(parsed));
        }

        let path = if fragment {
            self.resolve_fragment(client, name)
        } else {
            self.resolve(client, name)
        }
        .ok_or_else(|| self.not_found(client, name))?;

        let source = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let parsed = Arc::new(document::parse_operation_file(
            &source,
            &path,
            &type_name(client),
            &namespaced(client, name),
        )?);

        tracing::debug!(
            target: "switchyard::operation",
            path = %path.display(),
            operation = %parsed.name,
            kind = %parsed.kind,
            "parsed operation file"
        );

        *guard = Some(Arc::clone(&parsed));
        Ok(parsed)
    }

    fn assemble(
        &self,
        client: &str,
        root: &ParsedFile,
    ) -> Result<(OperationDefinition, HashSet<String>)> {
        let prefix = format!("{}__", type_name(client));
        let mut document = root.document.clone();
        let mut included: HashSet<String> = root.fragments.iter().cloned().collect();
        let mut pending: VecDeque<String> = root.external_fragments.iter().cloned().collect();
        let mut sources = HashSet::new();

        while let Some(fragment) = pending.pop_front() {
            if included.contains(&fragment) {
                continue;
            }

            let file = self.parsed_file(client, &fragment, true)?;
            sources.insert(operation_slug(&fragment));
            if !file.fragments.contains(&fragment) {
                return Err(Error::parse(
                    &file.path,
                    format!("expected a definition of fragment `{fragment}`"),
                ));
            }

            for definition in &file.document.definitions {
                let ast::Definition::FragmentDefinition(definition) = definition else {
                    continue;
                };
                let name = document::unprefixed(definition.name.as_str(), &prefix);
                if included.insert(name.to_string()) {
                    document
                        .definitions
                        .push(ast::Definition::FragmentDefinition(definition.clone()));
                }
            }
            pending.extend(file.external_fragments.iter().cloned());
        }

        let definition = OperationDefinition {
            client: type_name(client),
            name: root.name.clone(),
            kind: root.kind,
            variables: root.variables.clone(),
            query: document.to_string().trim_end().to_string(),
            path: root.path.clone(),
        };
        Ok((definition, sources))
    }
}

impl fmt::Debug for OperationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationStore")
            .field("roots", &self.roots)
            .field("fragment_files", &self.fragment_files)
            .field("cached", &self.definitions.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationKind;
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_load_namespaces_operation() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "github/user_repositories.graphql",
            "query($login: String!) { user(login: $login) { repositories { nodes { name } } } }",
        );

        let store = OperationStore::new([dir.path()]);
        let op = store.load("Github", "userRepositories").unwrap();

        assert_eq!(op.name(), "Github__UserRepositories");
        assert_eq!(op.client(), "Github");
        assert_eq!(op.kind(), OperationKind::Query);
        assert!(op.query().starts_with("query Github__UserRepositories("));
        assert!(!op.query().ends_with('\n'));
        assert_eq!(op.path(), dir.path().join("github/user_repositories.graphql"));
    }

    #[test]
    fn test_load_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "github/viewer.graphql", "{ viewer { login } }");

        let store = OperationStore::new([dir.path()]);
        let first = store.load("github", "viewer").unwrap();
        fs::remove_file(dir.path().join("github/viewer.graphql")).unwrap();
        let second = store.load("Github", "Viewer").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(store.cached("github", "viewer").is_some());
    }

    #[test]
    fn test_concurrent_loads_share_definition() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "github/viewer.graphql", "{ viewer { login } }");
        let store = Arc::new(OperationStore::new([dir.path()]));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.load("github", "viewer").unwrap())
            })
            .collect();
        let loaded: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(loaded.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "github/viewer.graphql", "{ viewer { login } }");

        let store = OperationStore::new([dir.path()]);
        let before = store.load("github", "viewer").unwrap();
        write(dir.path(), "github/viewer.graphql", "{ viewer { name } }");
        let after = store.reload("github", "viewer").unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.query().contains("name"));

        store.clear();
        assert!(store.cached("github", "viewer").is_none());
    }

    #[test]
    fn test_reload_fragment_drops_dependents() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "github/repository.graphql",
            "{ repository { ...RepositoryFields } }",
        );
        write(
            dir.path(),
            "github/repository_fields.graphql",
            "fragment RepositoryFields on Repository { name }",
        );
        write(dir.path(), "github/viewer.graphql", "{ viewer { login } }");

        let store = OperationStore::new([dir.path()]);
        let before = store.load("github", "repository").unwrap();
        let viewer = store.load("github", "viewer").unwrap();
        assert!(!before.query().contains("nameWithOwner"));

        write(
            dir.path(),
            "github/repository_fields.graphql",
            "fragment RepositoryFields on Repository { nameWithOwner }",
        );
        store.reload("github", "repository_fields").unwrap();

        assert!(store.cached("github", "repository").is_none());
        let after = store.load("github", "repository").unwrap();
        assert!(after.query().contains("nameWithOwner"), "{}", after.query());
        assert!(Arc::ptr_eq(&viewer, &store.cached("github", "viewer").unwrap()));
    }

    #[test]
    fn test_reload_fragment_file_drops_dependents() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "github/_repository_fields.graphql",
            "fragment RepositoryFields on Repository { name }",
        );
        write(
            dir.path(),
            "github/repository.graphql",
            "{ repository { ...RepositoryFields } }",
        );

        let store = OperationStore::new([dir.path()]).with_fragment_files(true);
        store.load("github", "repository").unwrap();

        write(
            dir.path(),
            "github/_repository_fields.graphql",
            "fragment RepositoryFields on Repository { url }",
        );
        store.reload("github", "repository_fields_fragment").unwrap();

        let after = store.load("github", "repository").unwrap();
        assert!(after.query().contains("url"), "{}", after.query());
    }

    #[test]
    fn test_roots_searched_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write(second.path(), "github/viewer.graphql", "{ viewer { login } }");
        write(second.path(), "github/user.graphql", "{ viewer { id } }");
        write(first.path(), "github/user.graphql", "{ viewer { name } }");

        let store = OperationStore::new([first.path(), second.path()]);
        assert_eq!(
            store.resolve("github", "viewer"),
            Some(second.path().join("github/viewer.graphql"))
        );
        assert!(store.load("github", "user").unwrap().query().contains("name"));
    }

    #[test]
    fn test_missing_operation_lists_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let store = OperationStore::new([dir.path()]);

        let err = store.load("Github", "repository").unwrap_err();
        match err {
            Error::OperationNotFound {
                client,
                operation,
                searched,
            } => {
                assert_eq!(client, "Github");
                assert_eq!(operation, "repository");
                assert!(searched.contains("github/repository.graphql"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_external_fragments_appended() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "github/repository.graphql",
            "query($owner: String!) { repository(owner: $owner) { ...RepositoryFields } }",
        );
        write(
            dir.path(),
            "github/repository_fields.graphql",
            "fragment RepositoryFields on Repository { name owner { ...OwnerFields } }",
        );
        write(
            dir.path(),
            "github/owner_fields.graphql",
            "fragment OwnerFields on User { login ...RepositoryFields }",
        );

        let store = OperationStore::new([dir.path()]);
        let op = store.load("github", "repository").unwrap();
        let query = op.query();

        assert!(query.contains("...Github__RepositoryFields"), "{query}");
        assert_eq!(
            query.matches("fragment Github__RepositoryFields on Repository").count(),
            1,
            "{query}"
        );
        assert_eq!(query.matches("fragment Github__OwnerFields on User").count(), 1);
        assert_eq!(op.required_variables().collect::<Vec<_>>(), vec!["owner"]);
    }

    #[test]
    fn test_unresolved_fragment_fails() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "github/repository.graphql",
            "{ repository { ...Missing } }",
        );

        let store = OperationStore::new([dir.path()]);
        assert!(matches!(
            store.load("github", "repository"),
            Err(Error::OperationNotFound { .. })
        ));
    }

    #[test]
    fn test_fragment_files_mode() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "github/_repository_fields.graphql",
            "fragment RepositoryFields on Repository { name }",
        );
        write(
            dir.path(),
            "github/repository.graphql",
            "{ repository { ...RepositoryFields } }",
        );

        let plain = OperationStore::new([dir.path()]);
        assert!(plain.load("github", "repository_fields_fragment").is_err());
        assert!(plain.load("github", "repository").is_err());

        let store = OperationStore::new([dir.path()]).with_fragment_files(true);
        let fragment = store.load("github", "repository_fields_fragment").unwrap();
        assert_eq!(fragment.kind(), OperationKind::Fragment);
        assert!(!fragment.is_executable());

        let op = store.load("github", "repository").unwrap();
        assert!(op.query().contains("fragment Github__RepositoryFields on Repository"));
    }

    #[test]
    fn test_preload_and_file_listing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "github/viewer.graphql", "{ viewer { login } }");
        write(dir.path(), "github/user.graphql", "{ viewer { id } }");
        write(
            dir.path(),
            "github/_owner.graphql",
            "fragment Owner on User { login }",
        );
        write(dir.path(), "github/notes.txt", "not graphql");

        let store = OperationStore::new([dir.path()]);
        let files = store.graphql_file_paths("Github");
        assert_eq!(files.len(), 3);

        let loaded = store.preload("Github").unwrap();
        let names: Vec<_> = loaded.iter().map(|op| op.name().to_string()).collect();
        assert_eq!(names, vec!["Github__User", "Github__Viewer"]);

        let with_fragments = OperationStore::new([dir.path()]).with_fragment_files(true);
        assert_eq!(with_fragments.preload("github").unwrap().len(), 3);
        assert!(with_fragments.graphql_file_paths("unknown").is_empty());
    }

    #[test]
    fn test_parse_error_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "github/broken.graphql", "query { viewer {");

        let store = OperationStore::new([dir.path()]);
        assert!(matches!(
            store.load("github", "broken"),
            Err(Error::Parse { .. })
        ));
    }
}
