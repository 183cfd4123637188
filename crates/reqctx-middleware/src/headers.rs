//! Header lookup over the request types the middleware accepts.

use std::borrow::Cow;
use std::collections::HashMap;
use std::hash::BuildHasher;

use http::{HeaderMap, HeaderValue, Request};

/// Read access to inbound request headers.
pub trait HeaderSource {
    /// Value of header `name`, matched case-insensitively.
    ///
    /// A header sent more than once reads as its values joined with `", "`
    /// in arrival order. Bytes that are not valid UTF-8 are replaced with
    /// U+FFFD rather than dropping the header.
    fn header(&self, name: &str) -> Option<Cow<'_, str>>;
}

fn decode(value: &HeaderValue) -> Cow<'_, str> {
    match value.to_str() {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => String::from_utf8_lossy(value.as_bytes()),
    }
}

impl HeaderSource for HeaderMap {
    fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        let mut values = self.get_all(name).iter().map(decode);
        let first = values.next()?;
        Some(values.fold(first, |joined, next| Cow::Owned(format!("{joined}, {next}"))))
    }
}

impl<B> HeaderSource for Request<B> {
    fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.headers().header(name)
    }
}

impl<S: BuildHasher> HeaderSource for HashMap<String, String, S> {
    fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| Cow::Borrowed(v.as_str()))
    }
}
