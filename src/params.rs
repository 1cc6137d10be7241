//! Ordered scalar form fields

use crate::framing::{Boundary, LINE_END, ensure_header_text};
use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

/// Field name consumed as HTTP headers instead of being written into the body
pub const RESERVED_KEY: &str = "headers";

/// Scalar form fields in insertion order.
///
/// The reserved [`RESERVED_KEY`] field is kept aside: it never becomes a form
/// field and is only read back through [`Params::header_map`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    fields: Vec<(String, String)>,
    headers: Option<Value>,
}

impl Params {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, builder style
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set the reserved headers field, builder style
    pub fn headers(mut self, headers: Value) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Insert a field. Re-inserting a name replaces its value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if name == RESERVED_KEY {
            self.headers = Some(Value::String(value));
            return;
        }
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Build a parameter set from a JSON object, keeping its key order.
    ///
    /// Strings are taken verbatim, any other value as its JSON text. Only a
    /// value that is not an object is rejected.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            tracing::error!("Upload parameters are not a JSON object");
            return Err(Error::ParameterSerialization {
                field: String::new(),
                message: "expected a JSON object".to_string(),
            });
        };

        let mut params = Params::new();
        for (key, value) in object {
            if key == RESERVED_KEY {
                params.headers = Some(value.clone());
                continue;
            }
            params.fields.push((key.clone(), stringify(value)));
        }
        Ok(params)
    }

    /// Look up a field value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over body fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of body fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no body fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Raw value of the reserved headers field
    pub fn reserved_headers(&self) -> Option<&Value> {
        self.headers.as_ref()
    }

    /// Serialize the non-file section of the body.
    ///
    /// Each field becomes `--<boundary>\r\nContent-Disposition: form-data;
    /// name="<key>"\r\n\r\n<value>\r\n`. Without files the section also closes
    /// the body; the CRLF after the last value is the leading CRLF of the end
    /// delimiter. With files nothing is appended, the last file part closes
    /// the body instead.
    pub fn serialize(&self, boundary: &Boundary, has_files: bool) -> Result<String> {
        let opener = boundary.opener();
        let mut out = String::new();
        for (name, value) in &self.fields {
            ensure_header_text("field name", name)?;
            out.push_str(&opener);
            out.push_str("Content-Disposition: form-data; name=\"");
            out.push_str(name);
            out.push('"');
            out.push_str(LINE_END);
            out.push_str(LINE_END);
            out.push_str(value);
            out.push_str(LINE_END);
        }
        if !has_files {
            if out.is_empty() {
                out.push_str(&boundary.end_delimiter());
            } else {
                out.push_str(&boundary.close_line());
            }
        }
        Ok(out)
    }

    /// Decode the reserved headers field.
    ///
    /// Accepts an object whose values are strings, scalars, or arrays of
    /// those (one header line per array element). Anything other than an
    /// object is ignored.
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        let Some(headers) = &self.headers else {
            return Ok(map);
        };
        let Some(object) = headers.as_object() else {
            tracing::warn!(kind = kind(headers), "Ignoring reserved headers field, not an object");
            return Ok(map);
        };

        for (name, value) in object {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidHeader(format!("{}: {}", name, e)))?;
            let values = match value {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                other => vec![other],
            };
            for item in values {
                let text = match item {
                    Value::String(_) | Value::Number(_) | Value::Bool(_) => stringify(item),
                    _ => {
                        return Err(Error::InvalidHeader(format!(
                            "{}: {} is not a header value",
                            name,
                            kind(item)
                        )));
                    }
                };
                let header_value = HeaderValue::from_str(&text)
                    .map_err(|e| Error::InvalidHeader(format!("{}: {}", name, e)))?;
                map.append(header_name.clone(), header_value);
            }
        }
        Ok(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
