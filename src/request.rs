//! Upload request construction

use crate::config::UploadConfig;
use crate::framing::Boundary;
use crate::params::Params;
use crate::part::{FileDescriptor, FilePart};
use crate::resource::ResourceApi;
use crate::{Error, Result};
use bytes::Bytes;
use futures_util::StreamExt;
use http::{HeaderMap, HeaderValue, header};
use serde_json::Value;

/// A piece of the body, in transmission order
#[derive(Debug)]
pub enum BodyPart {
    /// Text written as-is (the parameter section)
    Inline(Bytes),
    /// A file wrapped in its framing
    File(FilePart),
}

/// A fully framed `multipart/form-data` body with a known length.
///
/// Built once by [`UploadRequestBuilder::build`], which opens every file and
/// sizes it up front. The request owns the open streams until it is handed to
/// a transport with [`UploadRequest::into_parts`], [`UploadRequest::write_to`]
/// or [`UploadRequest::into_stream`]; dropping it closes them.
#[derive(Debug)]
pub struct UploadRequest {
    pub(crate) boundary: Boundary,
    pub(crate) params: Params,
    pub(crate) params_section: String,
    pub(crate) files: Vec<FilePart>,
    pub(crate) content_length: u64,
    pub(crate) headers: HeaderMap,
}

impl UploadRequest {
    /// Start building a request that opens files through `resources`
    pub fn builder<R: ResourceApi>(resources: R) -> UploadRequestBuilder<R> {
        UploadRequestBuilder::new(resources)
    }

    /// Build a request with default settings
    pub async fn new<R: ResourceApi>(
        params: Params,
        files: Vec<FileDescriptor>,
        resources: R,
    ) -> Result<Self> {
        Self::builder(resources)
            .params(params)
            .files(files)
            .build()
            .await
    }

    /// Build a request from a JSON parameter object and a JSON array of file
    /// descriptors
    pub async fn from_json<R: ResourceApi>(
        params: &Value,
        files: &Value,
        resources: R,
    ) -> Result<Self> {
        let params = Params::from_json(params)?;
        let files = FileDescriptor::list_from_json(files)?;
        Self::new(params, files, resources).await
    }

    /// Boundary used for this body
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Form fields of this body
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Serialized non-file section, sent first
    pub fn params_data(&self) -> &str {
        &self.params_section
    }

    /// File parts in transmission order
    pub fn files(&self) -> &[FilePart] {
        &self.files
    }

    /// Exact number of bytes in the body
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// `Content-Type` header value including the boundary
    pub fn content_type(&self) -> String {
        self.boundary.content_type()
    }

    /// Headers for the HTTP request: the reserved `headers` field plus
    /// `Content-Type` and `Content-Length` for this body
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Hand over the body pieces in transmission order
    pub fn into_parts(self) -> Vec<BodyPart> {
        let mut parts = Vec::with_capacity(self.files.len() + 1);
        if !self.params_section.is_empty() {
            parts.push(BodyPart::Inline(Bytes::from(self.params_section)));
        }
        parts.extend(self.files.into_iter().map(BodyPart::File));
        parts
    }
}

/// Builder for [`UploadRequest`]
pub struct UploadRequestBuilder<R> {
    resources: R,
    params: Params,
    files: Vec<FileDescriptor>,
    config: UploadConfig,
}

impl<R: ResourceApi> UploadRequestBuilder<R> {
    pub(crate) fn new(resources: R) -> Self {
        Self {
            resources,
            params: Params::new(),
            files: Vec::new(),
            config: UploadConfig::default(),
        }
    }

    /// Replace the form fields
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Add one form field
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name, value);
        self
    }

    /// Add one file
    pub fn file(mut self, file: FileDescriptor) -> Self {
        self.files.push(file);
        self
    }

    /// Add several files, keeping their order
    pub fn files(mut self, files: impl IntoIterator<Item = FileDescriptor>) -> Self {
        self.files.extend(files);
        self
    }

    /// Replace the settings
    pub fn config(mut self, config: UploadConfig) -> Self {
        self.config = config;
        self
    }

    /// Use the given boundary
    pub fn boundary(mut self, boundary: Boundary) -> Self {
        self.config.boundary = boundary;
        self
    }

    /// Frame the fields, open and size every file, and total the length.
    ///
    /// If any file fails to resolve, every stream opened for this request is
    /// closed before the error is returned.
    pub async fn build(self) -> Result<UploadRequest> {
        let Self {
            resources,
            params,
            files,
            config,
        } = self;

        let mut headers = params.header_map()?;
        let boundary = choose_boundary(&config, &params, &files);
        let params_section = params.serialize(&boundary, !files.is_empty())?;
        tracing::debug!(%params_section, "Parameter section");

        let total = files.len();
        let mut resolved = futures_util::stream::iter(files.iter().enumerate())
            .map(|(index, descriptor)| {
                FilePart::resolve(
                    descriptor,
                    index,
                    total,
                    &boundary,
                    &config.default_mime_type,
                    &resources,
                )
            })
            .buffered(config.resolve_concurrency.max(1));

        let mut parts = Vec::with_capacity(total);
        while let Some(result) = resolved.next().await {
            match result {
                Ok(part) => parts.push(part),
                Err(e) => {
                    tracing::debug!(
                        opened = parts.len(),
                        "Releasing streams after failed resolution"
                    );
                    drop(resolved);
                    drop(parts);
                    return Err(e);
                }
            }
        }
        drop(resolved);

        let content_length = params_section.len() as u64
            + parts.iter().map(FilePart::data_length).sum::<u64>();

        let content_type = HeaderValue::from_str(&boundary.content_type())
            .map_err(|e| Error::InvalidHeader(e.to_string()))?;
        headers.insert(header::CONTENT_TYPE, content_type);
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));

        tracing::debug!(content_length, files = parts.len(), "Built upload request");
        Ok(UploadRequest {
            boundary,
            params,
            params_section,
            files: parts,
            content_length,
            headers,
        })
    }
}

/// Keep the configured boundary unless it occurs inside form text.
///
/// A random boundary is regenerated on collision. A fixed one is kept so the
/// body stays reproducible, and the collision is only reported.
fn choose_boundary(config: &UploadConfig, params: &Params, files: &[FileDescriptor]) -> Boundary {
    let texts = || {
        params
            .iter()
            .flat_map(|(name, value)| [name, value])
            .chain(files.iter().flat_map(|f| {
                [Some(f.key.as_str()), Some(f.name.as_str()), f.mime_type.as_deref()]
                    .into_iter()
                    .flatten()
            }))
    };

    let mut boundary = config.boundary.clone();
    let mut retries = config.collision_retries;
    while let Some(text) = texts().find(|text| boundary.collides_with(text)) {
        if boundary.is_random() && retries > 0 {
            retries -= 1;
            boundary = Boundary::random();
            continue;
        }
        tracing::warn!(%boundary, text, "Boundary occurs inside form content");
        break;
    }
    boundary
}
