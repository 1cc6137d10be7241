//! Multipart framing tokens
//!
//! Every piece of multipart text uses CRLF line endings. Lengths of framing
//! text are always UTF-8 byte lengths (`str::len`), never character counts.

use crate::{Error, Result};
use rand::{Rng, distr::Alphanumeric};
use std::fmt;

/// Prefix of every boundary line
pub const LINE_START: &str = "--";

/// Line terminator of the multipart wire format
pub const LINE_END: &str = "\r\n";

/// Boundary token used unless a request opts into a random one
pub const DEFAULT_BOUNDARY: &str = "+++++";

const MAX_BOUNDARY_LEN: usize = 70;
const RANDOM_SUFFIX_LEN: usize = 24;

/// A multipart boundary token and the delimiters derived from it.
///
/// The default is the fixed token [`DEFAULT_BOUNDARY`]. A fixed token can
/// occur inside a field value, which would corrupt the body for a strict
/// parser; [`Boundary::random`] avoids that at the cost of a body that differs
/// between builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    token: String,
    random: bool,
}

impl Boundary {
    /// The fixed default boundary
    pub fn fixed() -> Self {
        Self {
            token: DEFAULT_BOUNDARY.to_string(),
            random: false,
        }
    }

    /// A caller-chosen boundary token.
    ///
    /// The token must be 1 to 70 characters from the RFC 2046 boundary
    /// alphabet and must not end with a space.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let valid = !token.is_empty()
            && token.len() <= MAX_BOUNDARY_LEN
            && !token.ends_with(' ')
            && token.chars().all(is_boundary_char);
        if !valid {
            return Err(Error::Encoding {
                what: "boundary",
                value: token,
            });
        }
        Ok(Self {
            token,
            random: false,
        })
    }

    /// A freshly generated random boundary
    pub fn random() -> Self {
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_SUFFIX_LEN)
            .map(char::from)
            .collect();
        Self {
            token: format!("multiform-{}", suffix),
            random: true,
        }
    }

    /// The bare token
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// Whether this boundary was generated by [`Boundary::random`]
    pub fn is_random(&self) -> bool {
        self.random
    }

    /// Opening line of a part: `--<boundary>\r\n`
    pub fn opener(&self) -> String {
        format!("{LINE_START}{}{LINE_END}", self.token)
    }

    /// Delimiter that chains into a following part: `\r\n--<boundary>\r\n`
    pub fn continue_delimiter(&self) -> String {
        format!("{LINE_END}{LINE_START}{}{LINE_END}", self.token)
    }

    /// Delimiter that terminates the body: `\r\n--<boundary>--\r\n`
    pub fn end_delimiter(&self) -> String {
        format!("{LINE_END}{}", self.close_line())
    }

    /// Closing line without its leading CRLF: `--<boundary>--\r\n`
    pub fn close_line(&self) -> String {
        format!("{LINE_START}{}{LINE_START}{LINE_END}", self.token)
    }

    /// `Content-Type` header value announcing this boundary
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.token)
    }

    /// Whether `text` contains a line that a parser could take for this boundary
    pub fn collides_with(&self, text: &str) -> bool {
        text.contains(&format!("{LINE_START}{}", self.token))
    }
}

impl Default for Boundary {
    fn default() -> Self {
        Self::fixed()
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

fn is_boundary_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "'()+_,-./:=? ".contains(c)
}

/// Reject header text that would break the line structure of a part header
pub(crate) fn ensure_header_text(what: &'static str, value: &str) -> Result<()> {
    if value.contains(|c: char| c == '\r' || c == '\n') {
        return Err(Error::Encoding {
            what,
            value: value.to_string(),
        });
    }
    Ok(())
}
