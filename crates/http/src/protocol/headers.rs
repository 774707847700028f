//! Case-insensitive header storage with RFC 2616 field normalization.
//!
//! Names are validated against the token grammar and lowercased. Values have linear
//! whitespace collapsed to a single space and trimmed, and control characters are rejected.
//!
//! Setting a field that is already present either replaces it or merges into it. Merging
//! joins the values with a comma, except for the fields whose values can not be combined that
//! way (`WWW-Authenticate`, `Proxy-Authenticate` and `Set-Cookie`), which keep one entry per
//! value instead.

use http::header::{AsHeaderName, Entry, HeaderMap, HeaderName, HeaderValue, Iter};
use http::header::{PROXY_AUTHENTICATE, SET_COOKIE, WWW_AUTHENTICATE};

use crate::protocol::HeaderError;
use crate::utils::{ensure, is_ctl, latin1};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    inner: HeaderMap,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header field.
    ///
    /// With `merge` unset any existing value is replaced, otherwise the new value is combined
    /// with the existing ones.
    pub fn set_header<N, V>(&mut self, name: N, value: V, merge: bool) -> Result<(), HeaderError>
    where
        N: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let name = normalize_field_name(name.as_ref())?;
        let value = normalize_field_value(value.as_ref())?;

        if !merge {
            self.inner.insert(name, value);
            return Ok(());
        }

        match self.inner.entry(name) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(mut entry) => {
                if is_multi_valued(entry.key()) {
                    entry.append(value);
                } else {
                    let joined = [entry.get().as_bytes(), b",", value.as_bytes()].concat();
                    let joined = HeaderValue::from_bytes(&joined).map_err(HeaderError::invalid_value)?;
                    entry.insert(joined);
                }
            }
        }
        Ok(())
    }

    /// Returns the value of a header as text, with multiple entries joined by `\n`.
    pub fn get_header<N: AsRef<[u8]>>(&self, name: N) -> Result<String, HeaderError> {
        let name = normalize_field_name(name.as_ref())?;

        let mut values = self.inner.get_all(&name).iter();
        let Some(first) = values.next() else {
            return Err(HeaderError::not_found(name));
        };

        let mut result = latin1(first.as_bytes());
        for value in values {
            result.push('\n');
            result.push_str(&latin1(value.as_bytes()));
        }
        Ok(result)
    }

    /// Returns every distinct value stored under a header name, in insertion order.
    pub fn get_header_values<N: AsRef<[u8]>>(&self, name: N) -> Result<Vec<String>, HeaderError> {
        let name = normalize_field_name(name.as_ref())?;
        let values: Vec<String> = self.inner.get_all(&name).iter().map(|value| latin1(value.as_bytes())).collect();
        ensure!(!values.is_empty(), HeaderError::not_found(name));
        Ok(values)
    }

    pub fn has_header<N: AsRef<[u8]>>(&self, name: N) -> Result<bool, HeaderError> {
        let name = normalize_field_name(name.as_ref())?;
        Ok(self.inner.contains_key(name))
    }

    /// Returns the first raw value stored for `key`.
    pub fn get<K: AsHeaderName>(&self, key: K) -> Option<&HeaderValue> {
        self.inner.get(key)
    }

    pub fn contains<K: AsHeaderName>(&self, key: K) -> bool {
        self.inner.contains_key(key)
    }

    pub fn remove<K: AsHeaderName>(&mut self, key: K) -> Option<HeaderValue> {
        self.inner.remove(key)
    }

    pub fn iter(&self) -> Iter<'_, HeaderValue> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn as_map(&self) -> &HeaderMap {
        &self.inner
    }

    pub fn into_map(self) -> HeaderMap {
        self.inner
    }
}

impl<'a> IntoIterator for &'a HttpHeaders {
    type Item = (&'a HeaderName, &'a HeaderValue);
    type IntoIter = Iter<'a, HeaderValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn is_multi_valued(name: &HeaderName) -> bool {
    name == WWW_AUTHENTICATE || name == PROXY_AUTHENTICATE || name == SET_COOKIE
}

/// Validates a field name against the token grammar and lowercases it.
fn normalize_field_name(name: &[u8]) -> Result<HeaderName, HeaderError> {
    HeaderName::from_bytes(name).map_err(|_| HeaderError::invalid_name(latin1(name)))
}

/// Collapses linear whitespace (`[CRLF] 1*(SP|HT)`) into one space, trims both ends and
/// rejects remaining control characters.
fn normalize_field_value(value: &[u8]) -> Result<HeaderValue, HeaderError> {
    let mut normalized = Vec::with_capacity(value.len());
    let mut pending_space = false;
    let mut i = 0;

    while i < value.len() {
        let lws = lws_len(&value[i..]);
        if lws > 0 {
            pending_space = !normalized.is_empty();
            i += lws;
            continue;
        }

        let byte = value[i];
        ensure!(!is_ctl(byte), HeaderError::invalid_value(format!("control character 0x{byte:02x} in {:?}", latin1(value))));

        if pending_space {
            normalized.push(b' ');
            pending_space = false;
        }
        normalized.push(byte);
        i += 1;
    }

    HeaderValue::from_bytes(&normalized).map_err(HeaderError::invalid_value)
}

/// Length of the linear whitespace run at the start of `bytes`.
fn lws_len(bytes: &[u8]) -> usize {
    let mut len = 0;
    loop {
        let rest = &bytes[len..];
        let skip = match rest {
            [b' ' | b'\t', ..] => 1,
            [b'\r', b'\n', b' ' | b'\t', ..] => 3,
            _ => return len,
        };
        len += skip;
    }
}
