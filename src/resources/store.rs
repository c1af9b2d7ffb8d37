//! Resource resolution and already-open resource handles.
//!
//! # Responsibilities
//! - Define the hosting resource facility (`ResourceStore`)
//! - Provide a file-system web root implementation
//! - Pair connection metadata with the stream that proved the resource exists
//!
//! # Design Decisions
//! - `resource()` may be optimistic; only `connect()` proves existence
//! - An `OpenResource` owns its stream, dropping the handle closes it
//! - Web root lookups never escape the root directory

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use url::Url;

/// Metadata of a resource connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Canonical URL of the resource.
    pub url: Url,
    /// Modification time, if the store knows it.
    pub last_modified: Option<SystemTime>,
    /// Length in bytes, if known in advance.
    pub content_length: Option<u64>,
    /// MIME type reported by the store, if any.
    pub content_type: Option<String>,
}

/// A resource whose stream has already been opened.
///
/// The stream is the only way to read the resource and is closed exactly
/// once, when the handle is dropped.
pub struct OpenResource {
    connection: Connection,
    stream: Box<dyn Read + Send>,
}

impl OpenResource {
    pub fn new(connection: Connection, stream: Box<dyn Read + Send>) -> Self {
        Self { connection, stream }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn url(&self) -> &Url {
        &self.connection.url
    }

    pub fn stream(&mut self) -> &mut (dyn Read + Send) {
        self.stream.as_mut()
    }
}

impl fmt::Debug for OpenResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenResource")
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

/// The hosting environment's resource-resolution facility.
pub trait ResourceStore: Send + Sync {
    /// Resolve a `/`-rooted path to a URL. May return URLs of missing resources.
    fn resource(&self, path: &str) -> Option<Url>;

    /// Open `url`. Failing here is the only reliable "does not exist" signal.
    fn connect(&self, url: &Url) -> io::Result<OpenResource>;
}

/// Serves resources from a directory on disk.
#[derive(Debug, Clone)]
pub struct WebRoot {
    root: PathBuf,
}

impl WebRoot {
    /// Create a web root; relative paths are resolved against the working directory.
    pub fn new<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        Ok(Self {
            root: std::path::absolute(root)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn map_path(&self, path: &str) -> Option<PathBuf> {
        let mut pb = self.root.clone();
        for comp in Path::new(path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }
}

impl ResourceStore for WebRoot {
    fn resource(&self, path: &str) -> Option<Url> {
        let path = self.map_path(path)?;
        Url::from_file_path(path).ok()
    }

    fn connect(&self, url: &Url) -> io::Result<OpenResource> {
        let path = url
            .to_file_path()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "not a file URL"))?;
        if !path.starts_with(&self.root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "outside of the web root",
            ));
        }
        let file = File::open(&path)?;
        let metadata = file.metadata()?;
        if metadata.is_dir() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "is a directory"));
        }
        let connection = Connection {
            url: url.clone(),
            last_modified: metadata.modified().ok(),
            content_length: Some(metadata.len()),
            content_type: None,
        };
        Ok(OpenResource::new(connection, Box::new(file)))
    }
}
