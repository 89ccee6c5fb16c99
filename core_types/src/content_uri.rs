use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::CoreTypeError;

/// Opaque locator of a media resource, e.g. `content://media/external/images/media/42`
/// or `file:///storage/emulated/0/DCIM/IMG_0001.jpg`.
///
/// Only the shape is validated: a scheme, a `:` and a non-empty remainder without
/// whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentUri(String);

impl ContentUri {
    pub fn parse(raw: &str) -> Result<Self, CoreTypeError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(CoreTypeError::InvalidArgumentType(
                "URI must not be blank".to_string(),
            ));
        }
        let Some((scheme, rest)) = value.split_once(':') else {
            return Err(CoreTypeError::InvalidArgumentType(format!(
                "URI has no scheme: {}",
                value
            )));
        };
        let mut scheme_chars = scheme.chars();
        let valid_scheme = scheme_chars
            .next()
            .is_some_and(|first| first.is_ascii_alphabetic())
            && scheme_chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return Err(CoreTypeError::InvalidArgumentType(format!(
                "URI has an invalid scheme: {}",
                value
            )));
        }
        if rest.is_empty() || rest.chars().any(char::is_whitespace) {
            return Err(CoreTypeError::InvalidArgumentType(format!(
                "URI is malformed: {}",
                value
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn scheme(&self) -> &str {
        self.0.split_once(':').map(|(scheme, _)| scheme).unwrap_or_default()
    }

    /// Path of a hierarchical URI without authority, query or fragment.
    pub fn path(&self) -> &str {
        let (_, rest) = self.0.split_once(':').unwrap_or(("", &self.0));
        let without_fragment = rest.split('#').next().unwrap_or_default();
        let without_query = without_fragment.split('?').next().unwrap_or_default();
        match without_query.strip_prefix("//") {
            Some(authority_and_path) => authority_and_path
                .find('/')
                .map(|index| &authority_and_path[index..])
                .unwrap_or_default(),
            None => without_query,
        }
    }

    pub fn last_path_segment(&self) -> Option<&str> {
        self.path()
            .rsplit('/')
            .find(|segment| !segment.is_empty())
    }
}

impl Display for ContentUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentUri {
    type Error = CoreTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ContentUri::parse(&value)
    }
}

impl From<ContentUri> for String {
    fn from(value: ContentUri) -> Self {
        value.0
    }
}

/// Decodes `%XX` escapes. Invalid escapes are kept as-is.
pub fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            let high = (bytes[index + 1] as char).to_digit(16);
            let low = (bytes[index + 2] as char).to_digit(16);
            if let (Some(high), Some(low)) = (high, low) {
                decoded.push((high * 16 + low) as u8);
                index += 3;
                continue;
            }
        }
        decoded.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_media_store_uri() {
        let uri = ContentUri::parse("content://media/external/images/media/42").unwrap();
        assert_eq!(uri.scheme(), "content");
        assert_eq!(uri.path(), "/external/images/media/42");
        assert_eq!(uri.last_path_segment(), Some("42"));
    }

    #[test]
    fn test_parse_file_uri() {
        let uri = ContentUri::parse("file:///tmp/photos/IMG_0001.jpg").unwrap();
        assert_eq!(uri.scheme(), "file");
        assert_eq!(uri.path(), "/tmp/photos/IMG_0001.jpg");
        assert_eq!(uri.last_path_segment(), Some("IMG_0001.jpg"));
    }

    #[test]
    fn test_query_and_fragment_are_not_part_of_path() {
        let uri = ContentUri::parse("content://media/external/images/media/7?limit=1#x").unwrap();
        assert_eq!(uri.last_path_segment(), Some("7"));
    }

    #[test]
    fn test_invalid_uris_are_rejected() {
        assert!(ContentUri::parse("").is_err());
        assert!(ContentUri::parse("   ").is_err());
        assert!(ContentUri::parse("no-scheme-here").is_err());
        assert!(ContentUri::parse("1abc://host/path").is_err());
        assert!(ContentUri::parse("content://media/with space").is_err());
        assert!(ContentUri::parse("content:").is_err());
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("image%3A1234"), "image:1234");
        assert_eq!(percent_decode("plain"), "plain");
        assert_eq!(percent_decode("bad%zzescape"), "bad%zzescape");
        assert_eq!(percent_decode("trailing%4"), "trailing%4");
    }
}
