//! Transport-side body writers
//!
//! Both writers emit the parameter section, then each file's header, contents
//! and trailing delimiter, and fail if the byte count differs from the
//! declared content length.

use crate::request::{BodyPart, UploadRequest};
use crate::resource::ResourceStream;
use crate::{Error, Result};
use bytes::Bytes;
use futures_util::Stream;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

const CHUNK_SIZE: usize = 16 * 1024;

impl UploadRequest {
    /// Write the whole body to `sink`, returning the number of bytes written
    pub async fn write_to<W>(self, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let declared = self.content_length;
        let mut written = 0u64;

        for part in self.into_parts() {
            match part {
                BodyPart::Inline(text) => {
                    sink.write_all(&text).await?;
                    written += text.len() as u64;
                }
                BodyPart::File(file) => {
                    let expected = file.resource_length();
                    let (before, mut stream, after) = file.into_parts();

                    sink.write_all(before.as_bytes()).await?;
                    let copied = tokio::io::copy(&mut stream, sink).await?;
                    drop(stream);
                    if copied != expected {
                        return Err(Error::LengthMismatch {
                            declared: expected,
                            actual: copied,
                        });
                    }
                    sink.write_all(after.as_bytes()).await?;

                    written += before.len() as u64 + copied + after.len() as u64;
                }
            }
        }
        sink.flush().await?;

        if written != declared {
            return Err(Error::LengthMismatch {
                declared,
                actual: written,
            });
        }
        Ok(written)
    }

    /// Turn the body into a stream of chunks for a streaming transport
    pub fn into_stream(self) -> BodyStream {
        let declared = self.content_length;
        let mut segments = VecDeque::new();
        for part in self.into_parts() {
            match part {
                BodyPart::Inline(text) => segments.push_back(Segment::Text(text)),
                BodyPart::File(file) => {
                    let expected = file.resource_length();
                    let (before, stream, after) = file.into_parts();
                    segments.push_back(Segment::Text(Bytes::from(before)));
                    segments.push_back(Segment::Reader {
                        stream,
                        expected,
                        read: 0,
                    });
                    segments.push_back(Segment::Text(Bytes::from(after)));
                }
            }
        }

        BodyStream {
            segments,
            buf: vec![0; CHUNK_SIZE],
            declared,
            produced: 0,
            finished: false,
        }
    }
}

enum Segment {
    Text(Bytes),
    Reader {
        stream: ResourceStream,
        expected: u64,
        read: u64,
    },
}

/// Body of an [`UploadRequest`] as a stream of byte chunks.
///
/// Yields an `InvalidData` error if a file produces a different number of
/// bytes than it reported when opened.
pub struct BodyStream {
    segments: VecDeque<Segment>,
    buf: Vec<u8>,
    declared: u64,
    produced: u64,
    finished: bool,
}

impl BodyStream {
    /// Total bytes the stream will yield
    pub fn content_length(&self) -> u64 {
        self.declared
    }

    fn fail(&mut self, error: io::Error) -> Poll<Option<io::Result<Bytes>>> {
        self.segments.clear();
        self.finished = true;
        Poll::Ready(Some(Err(error)))
    }
}

fn mismatch(declared: u64, actual: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        Error::LengthMismatch { declared, actual },
    )
}

impl Stream for BodyStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            let Some(segment) = this.segments.front_mut() else {
                this.finished = true;
                if this.produced != this.declared {
                    return Poll::Ready(Some(Err(mismatch(this.declared, this.produced))));
                }
                return Poll::Ready(None);
            };

            match segment {
                Segment::Text(text) => {
                    let chunk = std::mem::take(text);
                    this.segments.pop_front();
                    if chunk.is_empty() {
                        continue;
                    }
                    this.produced += chunk.len() as u64;
                    return Poll::Ready(Some(Ok(chunk)));
                }
                Segment::Reader {
                    stream,
                    expected,
                    read,
                } => {
                    let mut buf = ReadBuf::new(&mut this.buf);
                    match Pin::new(stream).poll_read(cx, &mut buf) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Err(e)) => return this.fail(e),
                        Poll::Ready(Ok(())) => {}
                    }

                    let n = buf.filled().len() as u64;
                    let (expected, total) = (*expected, *read + n);
                    if n == 0 {
                        if total != expected {
                            return this.fail(mismatch(expected, total));
                        }
                        this.segments.pop_front();
                        continue;
                    }
                    if total > expected {
                        return this.fail(mismatch(expected, total));
                    }

                    *read = total;
                    let chunk = Bytes::copy_from_slice(buf.filled());
                    this.produced += n;
                    return Poll::Ready(Some(Ok(chunk)));
                }
            }
        }
    }
}
