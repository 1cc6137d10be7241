//! Resource access for file parts
//!
//! A [`ResourceApi`] turns the name a caller gave for a file into a locator
//! and opens it for a single forward read, reporting the exact byte length
//! up front from metadata rather than by draining the stream.

use crate::error::ResourceError;
use base64::Engine;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncRead;
use url::Url;

/// Owned, forward-only byte source of a file part
pub type ResourceStream = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// An opened resource and its exact length in bytes
pub struct OpenedResource {
    /// Stream positioned at the first byte
    pub stream: ResourceStream,
    /// Number of bytes the stream will yield
    pub length: u64,
}

impl OpenedResource {
    /// Wrap an already opened stream
    pub fn new(stream: impl AsyncRead + Send + Sync + Unpin + 'static, length: u64) -> Self {
        Self {
            stream: Box::new(stream),
            length,
        }
    }
}

impl fmt::Debug for OpenedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedResource")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Platform hook for locating and opening upload sources.
pub trait ResourceApi: Send + Sync {
    /// Rewrite a locator before it is opened. Identity by default.
    fn remap(&self, locator: Url) -> Url {
        locator
    }

    /// Turn a caller-supplied path or URI into a locator.
    ///
    /// Scheme-qualified names are parsed as URLs, anything else is treated as
    /// a local path and converted into a `file:` URL.
    fn resolve_locator(&self, raw: &str) -> Result<Url, ResourceError> {
        parse_locator(raw).map(|url| self.remap(url))
    }

    /// Open a locator for sequential reading
    fn open_for_read(
        &self,
        locator: &Url,
    ) -> impl Future<Output = Result<OpenedResource, ResourceError>> + Send;
}

impl<T: ResourceApi> ResourceApi for &T {
    fn remap(&self, locator: Url) -> Url {
        (**self).remap(locator)
    }

    fn resolve_locator(&self, raw: &str) -> Result<Url, ResourceError> {
        (**self).resolve_locator(raw)
    }

    fn open_for_read(
        &self,
        locator: &Url,
    ) -> impl Future<Output = Result<OpenedResource, ResourceError>> + Send {
        (**self).open_for_read(locator)
    }
}

impl<T: ResourceApi> ResourceApi for Arc<T> {
    fn remap(&self, locator: Url) -> Url {
        (**self).remap(locator)
    }

    fn resolve_locator(&self, raw: &str) -> Result<Url, ResourceError> {
        (**self).resolve_locator(raw)
    }

    fn open_for_read(
        &self,
        locator: &Url,
    ) -> impl Future<Output = Result<OpenedResource, ResourceError>> + Send {
        (**self).open_for_read(locator)
    }
}

/// Parse a name as a URL, falling back to an absolute `file:` URL for paths
pub fn parse_locator(raw: &str) -> Result<Url, ResourceError> {
    if raw.is_empty() {
        return Err(ResourceError::InvalidLocator(raw.to_string()));
    }

    match Url::parse(raw) {
        // Single-letter schemes are Windows drive letters, not URLs
        Ok(url) if url.scheme().len() > 1 => Ok(url),
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = Path::new(raw);
            let absolute = if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map_err(ResourceError::Unreadable)?
                    .join(path)
            };
            Url::from_file_path(&absolute)
                .map_err(|()| ResourceError::InvalidLocator(raw.to_string()))
        }
        Err(e) => Err(ResourceError::InvalidLocator(format!("{}: {}", raw, e))),
    }
}

/// Resources reachable from this process: `file:` and `data:` URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalResources;

impl LocalResources {
    /// Create the local resource handler
    pub fn new() -> Self {
        Self
    }
}

impl ResourceApi for LocalResources {
    async fn open_for_read(&self, locator: &Url) -> Result<OpenedResource, ResourceError> {
        match locator.scheme() {
            "file" => open_file(locator).await,
            "data" => open_data(locator),
            other => Err(ResourceError::UnsupportedScheme(other.to_string())),
        }
    }
}

async fn open_file(locator: &Url) -> Result<OpenedResource, ResourceError> {
    let path = locator
        .to_file_path()
        .map_err(|()| ResourceError::InvalidLocator(locator.to_string()))?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ResourceError::from_io(locator, e))?;
    let metadata = file
        .metadata()
        .await
        .map_err(|e| ResourceError::from_io(locator, e))?;

    if !metadata.is_file() {
        return Err(ResourceError::Unreadable(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        )));
    }

    tracing::debug!(path = %path.display(), length = metadata.len(), "Opened file for upload");
    Ok(OpenedResource::new(file, metadata.len()))
}

fn open_data(locator: &Url) -> Result<OpenedResource, ResourceError> {
    let invalid = || ResourceError::InvalidData(locator.to_string());

    let body = locator.as_str().strip_prefix("data:").ok_or_else(invalid)?;
    let body = body.split('#').next().unwrap_or_default();
    let (meta, payload) = body.split_once(',').ok_or_else(invalid)?;

    let decoded = urlencoding::decode_binary(payload.as_bytes());
    let bytes = if meta.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(decoded.as_ref())
            .map_err(|e| ResourceError::InvalidData(e.to_string()))?
    } else {
        decoded.into_owned()
    };

    let length = bytes.len() as u64;
    Ok(OpenedResource::new(std::io::Cursor::new(bytes), length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_scheme_names_are_kept() {
        let url = parse_locator("content://media/external/images/1").unwrap();
        assert_eq!(url.scheme(), "content");

        let url = parse_locator("file:///tmp/a.jpg").unwrap();
        assert_eq!(url.path(), "/tmp/a.jpg");
    }

    #[cfg(unix)]
    #[test]
    fn test_bare_paths_become_file_urls() {
        let url = parse_locator("/tmp/a b.jpg").unwrap();
        assert_eq!(url.as_str(), "file:///tmp/a%20b.jpg");

        let url = parse_locator("relative.png").unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/relative.png"));
    }

    #[test]
    fn test_empty_name_is_invalid() {
        assert!(matches!(parse_locator(""), Err(ResourceError::InvalidLocator(_))));
    }

    #[test]
    fn test_remap_is_applied() {
        struct Rooted;
        impl ResourceApi for Rooted {
            fn remap(&self, locator: Url) -> Url {
                Url::parse(&locator.as_str().replace("file:///", "file:///sandbox/")).unwrap()
            }
            async fn open_for_read(&self, _: &Url) -> Result<OpenedResource, ResourceError> {
                Err(ResourceError::NotFound(String::new()))
            }
        }

        let url = Rooted.resolve_locator("file:///a.jpg").unwrap();
        assert_eq!(url.as_str(), "file:///sandbox/a.jpg");
    }

    #[tokio::test]
    async fn test_open_file_reports_metadata_length() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[7u8; 1234]).unwrap();

        let resources = LocalResources::new();
        let locator = resources
            .resolve_locator(file.path().to_str().unwrap())
            .unwrap();
        let mut opened = resources.open_for_read(&locator).await.unwrap();
        assert_eq!(opened.length, 1234);

        let mut contents = Vec::new();
        opened.stream.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents.len(), 1234);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let locator = parse_locator(dir.path().join("missing.bin").to_str().unwrap()).unwrap();
        let err = LocalResources.open_for_read(&locator).await.unwrap_err();
        assert!(matches!(err, ResourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_directory_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let locator = parse_locator(dir.path().to_str().unwrap()).unwrap();
        let err = LocalResources.open_for_read(&locator).await.unwrap_err();
        assert!(matches!(err, ResourceError::Unreadable(_)));
    }

    #[tokio::test]
    async fn test_data_urls() {
        let locator = Url::parse("data:text/plain;base64,aGVsbG8=").unwrap();
        let mut opened = LocalResources.open_for_read(&locator).await.unwrap();
        assert_eq!(opened.length, 5);
        let mut contents = String::new();
        opened.stream.read_to_string(&mut contents).await.unwrap();
        assert_eq!(contents, "hello");

        let locator = Url::parse("data:,a%20b").unwrap();
        let opened = LocalResources.open_for_read(&locator).await.unwrap();
        assert_eq!(opened.length, 3);

        let locator = Url::parse("data:text/plain;base64,!!!").unwrap();
        assert!(matches!(
            LocalResources.open_for_read(&locator).await,
            Err(ResourceError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let locator = Url::parse("https://example.com/a.jpg").unwrap();
        assert!(matches!(
            LocalResources.open_for_read(&locator).await,
            Err(ResourceError::UnsupportedScheme(s)) if s == "https"
        ));
    }
}
