//! `multipart/form-data` upload bodies with an exact, precomputed length
//!
//! This crate frames scalar form fields and files into a multipart body and
//! works out its `Content-Length` before anything is sent. Files are opened
//! and sized through a [`ResourceApi`] but never read into memory; their
//! streams are handed to the transport in order.
//!
//! ```no_run
//! use multiform::{FileDescriptor, LocalResources, UploadRequest};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let request = UploadRequest::builder(LocalResources::new())
//!     .param("album", "holiday")
//!     .file(FileDescriptor::new("photo", "/tmp/beach.jpg"))
//!     .build()
//!     .await?;
//!
//! println!("Uploading {} bytes", request.content_length());
//! let mut sink = tokio::io::sink();
//! request.write_to(&mut sink).await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

pub use body::BodyStream;
pub use config::UploadConfig;
pub use error::{Error, ResourceError, Result};
pub use framing::Boundary;
pub use params::{Params, RESERVED_KEY};
pub use part::{DEFAULT_MIME_TYPE, FileDescriptor, FilePart};
pub use request::{BodyPart, UploadRequest, UploadRequestBuilder};
pub use resource::{LocalResources, OpenedResource, ResourceApi, ResourceStream, parse_locator};

mod backend;
mod body;
mod config;
mod error;
pub mod framing;
mod params;
mod part;
mod request;
mod resource;
