//! Reqwest adapter for streaming an upload request

use crate::UploadRequest;

impl UploadRequest {
    /// Prepare a reqwest request that streams this body.
    ///
    /// The request carries the reserved headers plus `Content-Type` and
    /// `Content-Length`, so the body is sent with a fixed length rather than
    /// chunked.
    #[cfg_attr(docsrs, doc(cfg(feature = "backend-reqwest")))]
    pub fn into_reqwest(
        self,
        client: &reqwest::Client,
        method: http::Method,
        url: url::Url,
    ) -> reqwest::RequestBuilder {
        let headers = self.headers().clone();
        tracing::debug!(
            %url,
            content_length = self.content_length(),
            "Streaming upload via reqwest"
        );
        client
            .request(method, url)
            .headers(headers)
            .body(reqwest::Body::wrap_stream(self.into_stream()))
    }
}

#[cfg(test)]
mod tests {
    use crate::{FileDescriptor, Params, UploadRequest};
    use std::io::Write;

    #[tokio::test]
    async fn test_request_carries_length_headers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"payload").unwrap();

        let descriptor = FileDescriptor::new("doc", file.path().to_str().unwrap())
            .mime_type("text/plain");
        let request = UploadRequest::new(
            Params::new().field("kind", "note"),
            vec![descriptor],
            crate::LocalResources::new(),
        )
        .await
        .unwrap();
        let content_length = request.content_length();

        let client = reqwest::Client::new();
        let url = url::Url::parse("http://localhost:9/upload").unwrap();
        let built = request
            .into_reqwest(&client, http::Method::POST, url)
            .build()
            .unwrap();

        assert_eq!(built.method(), &http::Method::POST);
        assert_eq!(
            built.headers()[http::header::CONTENT_LENGTH],
            content_length.to_string().as_str()
        );
        assert_eq!(
            built.headers()[http::header::CONTENT_TYPE],
            "multipart/form-data; boundary=+++++"
        );
        assert!(built.body().is_some());
    }
}
