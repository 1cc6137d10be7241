//! Request construction settings

use crate::framing::Boundary;
use crate::part::DEFAULT_MIME_TYPE;

/// Settings for building an [`UploadRequest`](crate::UploadRequest)
#[derive(Clone, Debug)]
pub struct UploadConfig {
    /// Boundary token; fixed by default
    pub boundary: Boundary,
    /// MIME type for descriptors that do not name one
    pub default_mime_type: String,
    /// How many file descriptors may be opened at once. Part order never
    /// depends on this.
    pub resolve_concurrency: usize,
    /// How often a random boundary is regenerated when it collides with a
    /// field. Has no effect on a fixed boundary.
    pub collision_retries: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            boundary: Boundary::fixed(),
            default_mime_type: DEFAULT_MIME_TYPE.to_string(),
            resolve_concurrency: 1,
            collision_retries: 3,
        }
    }
}

impl UploadConfig {
    /// Default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given boundary
    pub fn boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = boundary;
        self
    }

    /// Use a freshly generated random boundary
    pub fn random_boundary(mut self) -> Self {
        self.boundary = Boundary::random();
        self
    }

    /// Set the MIME type for descriptors without one
    pub fn default_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.default_mime_type = mime_type.into();
        self
    }

    /// Open up to `n` files at once (at least one)
    pub fn resolve_concurrency(mut self, n: usize) -> Self {
        self.resolve_concurrency = n.max(1);
        self
    }

    /// Set how often a colliding random boundary is regenerated
    pub fn collision_retries(mut self, retries: usize) -> Self {
        self.collision_retries = retries;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UploadConfig::default();
        assert_eq!(config.boundary, Boundary::fixed());
        assert_eq!(config.default_mime_type, "image/jpg");
        assert_eq!(config.resolve_concurrency, 1);
    }

    #[test]
    fn test_concurrency_floor() {
        assert_eq!(UploadConfig::new().resolve_concurrency(0).resolve_concurrency, 1);
        assert!(UploadConfig::new().random_boundary().boundary.is_random());
    }
}
