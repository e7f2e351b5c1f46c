use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;

use snafu::{Location, ResultExt as _, Snafu};
use tracing::instrument;
use url::Url;

use crate::Located;

pub type Result<T, E = ObjectStoreError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ObjectStoreError {
    #[snafu(display("`{key}` is not a valid object key at {location}"))]
    InvalidKey {
        key: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("no object `{key}` at {location}"))]
    ObjectNotFound {
        key: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to access object `{key}` at {location}: {source}"))]
    Io {
        key: String,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot build a public url for `{key}` at {location}: {source}"))]
    PublicUrl {
        key: String,
        source: url::ParseError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for ObjectStoreError {
    fn location(&self) -> Location {
        match self {
            ObjectStoreError::InvalidKey { location, .. }
            | ObjectStoreError::ObjectNotFound { location, .. }
            | ObjectStoreError::Io { location, .. }
            | ObjectStoreError::PublicUrl { location, .. } => *location,
        }
    }
}

/// Binary blobs (the webinar videos) addressed by key.
///
/// The timeline never touches this directly, it only ever receives the playable url.
pub trait ObjectStore: std::fmt::Debug + Send + Sync + 'static {
    /// Stores `bytes` under `key`, replacing what was there, and returns where it can be played from.
    fn put(&self, key: &str, bytes: Vec<u8>) -> impl Future<Output = Result<Url>> + Send;

    fn get(&self, key: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Removing a missing key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    fn url(&self, key: &str) -> Result<Url>;
}

/// Keeps objects as plain files in one directory, served under `public_url`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_url: Url,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_url: Url) -> Self {
        // without the trailing slash `join` would replace the last path segment
        let public_url = if public_url.path().ends_with('/') {
            public_url
        } else {
            let mut url = public_url;
            url.set_path(&format!("{}/", url.path()));
            url
        };

        Self {
            root: root.into(),
            public_url,
        }
    }

    fn path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

/// Keys are a single file name: ascii letters, digits, `.`, `-` and `_`, not starting with a dot.
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));

    snafu::ensure!(valid, InvalidKeySnafu { key });
    Ok(())
}

impl ObjectStore for LocalObjectStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<Url> {
        let path = self.path(key)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .context(IoSnafu { key })?;
        tokio::fs::write(&path, bytes).await.context(IoSnafu { key })?;

        tracing::info!(path = %path.display(), "stored object `{}`", key);
        self.url(key)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path(key)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => ObjectNotFoundSnafu { key }.fail(),
            Err(err) => Err(err).context(IoSnafu { key }),
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!("object `{}` was already gone", key);
                Ok(())
            }
            Err(err) => Err(err).context(IoSnafu { key }),
        }
    }

    fn url(&self, key: &str) -> Result<Url> {
        self.path(key)?;
        self.public_url.join(key).context(PublicUrlSnafu { key })
    }
}
