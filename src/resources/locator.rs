//! Locale-aware resource lookup.
//!
//! # Responsibilities
//! - Resolve a logical path to the most locale-specific variant that opens
//! - Treat directories and unopenable candidates as absent
//! - Hand back the stream that proved existence instead of reopening it
//!
//! # Design Decisions
//! - Opening is the only existence check; some stores resolve URLs for
//!   resources that are not there
//! - Candidate failures are absorbed and logged at trace level
//! - Exhausting every candidate yields `None`, never an error

use std::sync::Arc;

use url::Url;

use crate::resources::locale::{localized_candidates, Locale};
use crate::resources::store::{OpenResource, ResourceStore};

/// Finds and opens resources through a `ResourceStore`.
#[derive(Clone)]
pub struct ResourceLocator {
    store: Arc<dyn ResourceStore>,
}

impl ResourceLocator {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// Resolve `path` through the store, then open its best localized variant.
    pub fn open_path_by_locale(&self, path: &str, locale: &Locale) -> Option<OpenResource> {
        let url = self.store.resource(path)?;
        self.select_by_locale(&url, locale)
    }

    /// Open the first of `url`'s localized candidates that exists.
    pub fn select_by_locale(&self, url: &Url, locale: &Locale) -> Option<OpenResource> {
        localized_candidates(url.as_str(), locale)
            .into_iter()
            .find_map(|candidate| match Url::parse(&candidate) {
                Ok(candidate) => self.open_url(&candidate),
                Err(e) => {
                    tracing::trace!(
                        candidate = %candidate,
                        error = %e,
                        "Skipping malformed candidate"
                    );
                    None
                }
            })
    }

    /// Open `url`, absorbing store differences: directories and open errors are absent.
    pub fn open_url(&self, url: &Url) -> Option<OpenResource> {
        if is_directory(url) {
            tracing::trace!(url = %url, "Resource is a directory");
            return None;
        }
        match self.store.connect(url) {
            Ok(resource) => Some(resource),
            Err(e) => {
                tracing::trace!(url = %url, error = %e, "Resource did not open");
                None
            }
        }
    }

    /// Resolve a path through the store and open it, without localization.
    pub fn open_path(&self, path: &str) -> Option<OpenResource> {
        let url = self.store.resource(path)?;
        self.open_url(&url)
    }
}

fn is_directory(url: &Url) -> bool {
    url.scheme() == "file"
        && url
            .to_file_path()
            .map(|path| path.is_dir())
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{self, Cursor, Read};
    use std::sync::Mutex;

    use crate::resources::store::{Connection, WebRoot};

    /// Resolves every path and only fails when opened, recording attempts.
    #[derive(Default)]
    struct OptimisticStore {
        files: HashMap<String, &'static str>,
        attempts: Mutex<Vec<String>>,
    }

    impl OptimisticStore {
        fn with(files: &[(&str, &'static str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(path, body)| (format!("mem://app{path}"), *body))
                    .collect(),
                attempts: Mutex::default(),
            }
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    impl ResourceStore for OptimisticStore {
        fn resource(&self, path: &str) -> Option<Url> {
            Url::parse(&format!("mem://app{path}")).ok()
        }

        fn connect(&self, url: &Url) -> io::Result<OpenResource> {
            self.attempts.lock().unwrap().push(url.to_string());
            let body = self
                .files
                .get(url.as_str())
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing"))?;
            let connection = Connection {
                url: url.clone(),
                last_modified: None,
                content_length: Some(body.len() as u64),
                content_type: None,
            };
            Ok(OpenResource::new(connection, Box::new(Cursor::new(body.as_bytes()))))
        }
    }

    fn read(mut res: OpenResource) -> String {
        let mut s = String::new();
        res.stream().read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn test_tries_candidates_in_order() {
        let store = Arc::new(OptimisticStore::with(&[("/page.html", "default")]));
        let locator = ResourceLocator::new(store.clone());

        let res = locator
            .open_path_by_locale("/page.html", &Locale::new("ja", "JP", "osaka"))
            .unwrap();
        assert_eq!(read(res), "default");
        assert_eq!(
            store.attempts(),
            vec![
                "mem://app/page_ja_JP_osaka.html",
                "mem://app/page_ja_JP.html",
                "mem://app/page_ja.html",
                "mem://app/page.html",
            ]
        );
    }

    #[test]
    fn test_stops_at_first_that_opens() {
        let store = Arc::new(OptimisticStore::with(&[
            ("/page_ja.html", "ja"),
            ("/page.html", "default"),
        ]));
        let locator = ResourceLocator::new(store.clone());

        let res = locator
            .open_path_by_locale("/page.html", &Locale::new("ja", "JP", ""))
            .unwrap();
        assert_eq!(read(res), "ja");
        assert_eq!(store.attempts().len(), 2);
    }

    #[test]
    fn test_extensionless_path_is_tried_once() {
        let store = Arc::new(OptimisticStore::default());
        let locator = ResourceLocator::new(store.clone());

        assert!(locator
            .open_path_by_locale("/LICENSE", &Locale::new("fr", "FR", ""))
            .is_none());
        assert_eq!(store.attempts(), vec!["mem://app/LICENSE"]);
    }

    #[test]
    fn test_directories_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("assets.v2")).unwrap();
        let locator = ResourceLocator::new(Arc::new(WebRoot::new(dir.path()).unwrap()));

        assert!(locator
            .open_path_by_locale("/assets.v2", &Locale::new("en", "", ""))
            .is_none());
        assert!(locator.open_path("/").is_none());
    }
}
