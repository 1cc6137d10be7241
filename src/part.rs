//! File descriptors and their resolved multipart parts

use crate::framing::{Boundary, LINE_END, ensure_header_text};
use crate::resource::{ResourceApi, ResourceStream};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use url::Url;

/// MIME type used when a descriptor does not name one
pub const DEFAULT_MIME_TYPE: &str = "image/jpg";

/// A file to upload: form key, path or URI, and optional MIME type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Form field name of the file
    pub key: String,
    /// Local path or URI of the file; also sent as the part's filename
    pub name: String,
    /// MIME type of the file contents
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl FileDescriptor {
    /// Describe a file with the default MIME type
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            mime_type: None,
        }
    }

    /// Set the MIME type
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Parse a JSON array of `{ "key", "name", "mimeType"? }` records
    pub fn list_from_json(value: &Value) -> Result<Vec<Self>> {
        let Some(items) = value.as_array() else {
            return Err(Error::Json(<serde_json::Error as serde::de::Error>::custom(
                "expected an array of file descriptors",
            )));
        };
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                Self::deserialize(item).map_err(|source| Error::InvalidDescriptor { index, source })
            })
            .collect()
    }
}

/// One file of the body: framing text around an owned byte stream.
///
/// `data_length` is the exact number of bytes the part puts on the wire:
/// both framing strings plus the resource length reported when it was opened.
pub struct FilePart {
    key: String,
    name: String,
    mime_type: String,
    locator: Url,
    before_header: String,
    after_header: String,
    stream: ResourceStream,
    resource_length: u64,
    data_length: u64,
}

impl FilePart {
    /// Frame and open the file at `index` of a list of `total` files.
    ///
    /// Only the last file carries the end delimiter; every other file chains
    /// into the next part with the continue delimiter.
    pub async fn resolve<R: ResourceApi>(
        descriptor: &FileDescriptor,
        index: usize,
        total: usize,
        boundary: &Boundary,
        default_mime_type: &str,
        resources: &R,
    ) -> Result<Self> {
        let mime_type = descriptor
            .mime_type
            .as_deref()
            .unwrap_or(default_mime_type)
            .to_string();

        let before_header =
            before_header(boundary, &descriptor.key, &descriptor.name, &mime_type)?;
        let after_header = if index + 1 == total {
            boundary.end_delimiter()
        } else {
            boundary.continue_delimiter()
        };
        tracing::debug!(index, %before_header, %after_header, "File part headers");

        let resolution_error = |source| Error::FileResolution {
            key: descriptor.key.clone(),
            name: descriptor.name.clone(),
            source,
        };
        let locator = resources
            .resolve_locator(&descriptor.name)
            .map_err(resolution_error)?;
        let opened = resources
            .open_for_read(&locator)
            .await
            .map_err(resolution_error)?;

        let data_length = before_header.len() as u64 + after_header.len() as u64 + opened.length;
        Ok(Self {
            key: descriptor.key.clone(),
            name: descriptor.name.clone(),
            mime_type,
            locator,
            before_header,
            after_header,
            stream: opened.stream,
            resource_length: opened.length,
            data_length,
        })
    }

    /// Form field name
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name as supplied by the caller
    pub fn name(&self) -> &str {
        &self.name
    }

    /// MIME type announced in the part header
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Locator the stream was opened from
    pub fn locator(&self) -> &Url {
        &self.locator
    }

    /// Header block written before the file bytes
    pub fn before_header(&self) -> &str {
        &self.before_header
    }

    /// Continue or end delimiter written after the file bytes
    pub fn after_header(&self) -> &str {
        &self.after_header
    }

    /// Bytes of file content the stream will yield
    pub fn resource_length(&self) -> u64 {
        self.resource_length
    }

    /// Bytes this part contributes to the body
    pub fn data_length(&self) -> u64 {
        self.data_length
    }

    /// Whether this part closes the body
    pub fn is_last(&self, boundary: &Boundary) -> bool {
        self.after_header == boundary.end_delimiter()
    }

    /// Give up the framing and hand over the stream
    pub fn into_parts(self) -> (String, ResourceStream, String) {
        (self.before_header, self.stream, self.after_header)
    }
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("locator", &self.locator.as_str())
            .field("resource_length", &self.resource_length)
            .field("data_length", &self.data_length)
            .finish_non_exhaustive()
    }
}

/// Header block that precedes a file's bytes
pub fn before_header(
    boundary: &Boundary,
    key: &str,
    name: &str,
    mime_type: &str,
) -> Result<String> {
    ensure_header_text("file key", key)?;
    ensure_header_text("file name", name)?;
    ensure_header_text("MIME type", mime_type)?;

    Ok(format!(
        "{opener}Content-Disposition: form-data; name=\"{key}\"; filename=\"{name}\"{LINE_END}\
         Content-Type: {mime_type}{LINE_END}{LINE_END}",
        opener = boundary.opener(),
    ))
}
