use base64::{Engine, engine::general_purpose::STANDARD};
use core_types::ContentUri;
use sha1::{Digest, Sha1};

pub const TAG_UPLOAD: &str = "upload";
pub const TAG_POLL: &str = "poll";
pub const TAG_DRAIN: &str = "drain";

const PREFIX_UNIQUE: &str = "unique:";
const PREFIX_URI: &str = "uri:";
const PREFIX_DISPLAY_NAME: &str = "display:";
const PREFIX_KEY: &str = "key:";
const PREFIX_KIND: &str = "kind:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadWorkKind {
    #[default]
    Upload,
    Poll,
    Drain,
}

impl UploadWorkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadWorkKind::Upload => "upload",
            UploadWorkKind::Poll => "poll",
            UploadWorkKind::Drain => "drain",
        }
    }

    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "upload" => Some(UploadWorkKind::Upload),
            "poll" => Some(UploadWorkKind::Poll),
            "drain" => Some(UploadWorkKind::Drain),
            _ => None,
        }
    }
}

/// What a per item upload request carries in its tags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadWorkMetadata {
    pub unique_name: Option<String>,
    pub uri: Option<ContentUri>,
    pub display_name: Option<String>,
    pub idempotency_key: Option<String>,
    pub kind: UploadWorkKind,
}

impl UploadWorkMetadata {
    /// Tags for a work request: the plain kind tag followed by the encoded values.
    pub fn tags(&self) -> Vec<String> {
        let mut tags = vec![self.kind.as_str().to_string()];
        if let Some(unique_name) = &self.unique_name {
            tags.push(format!("{}{}", PREFIX_UNIQUE, encode(unique_name)));
        }
        if let Some(uri) = &self.uri {
            tags.push(format!("{}{}", PREFIX_URI, encode(uri.as_str())));
        }
        if let Some(display_name) = &self.display_name {
            tags.push(format!("{}{}", PREFIX_DISPLAY_NAME, encode(display_name)));
        }
        if let Some(key) = &self.idempotency_key {
            tags.push(format!("{}{}", PREFIX_KEY, encode(key)));
        }
        tags.push(format!("{}{}", PREFIX_KIND, encode(self.kind.as_str())));
        tags
    }
}

/// Reads the encoded values back from a tag list. Undecodable values are dropped.
pub fn metadata_from(tags: &[String]) -> UploadWorkMetadata {
    UploadWorkMetadata {
        unique_name: decode_with_prefix(tags, PREFIX_UNIQUE),
        uri: decode_with_prefix(tags, PREFIX_URI).and_then(|raw| ContentUri::parse(&raw).ok()),
        display_name: decode_with_prefix(tags, PREFIX_DISPLAY_NAME),
        idempotency_key: decode_with_prefix(tags, PREFIX_KEY),
        kind: decode_with_prefix(tags, PREFIX_KIND)
            .and_then(|raw| UploadWorkKind::from_raw(&raw))
            .unwrap_or_default(),
    }
}

/// Unique work name of the upload of one URI.
pub fn unique_name_for_uri(uri: &ContentUri) -> String {
    let digest = Sha1::digest(uri.as_str().as_bytes());
    format!("upload:{}", hex::encode(digest))
}

fn encode(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

fn decode_with_prefix(tags: &[String], prefix: &str) -> Option<String> {
    let encoded = tags.iter().find_map(|tag| tag.strip_prefix(prefix))?;
    let bytes = STANDARD.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri() -> ContentUri {
        ContentUri::parse("content://media/external/images/media/42").unwrap()
    }

    #[test]
    fn test_tags_carry_metadata() {
        let metadata = UploadWorkMetadata {
            unique_name: Some(unique_name_for_uri(&uri())),
            uri: Some(uri()),
            display_name: Some("Отпуск 2024.jpg".to_string()),
            idempotency_key: Some("key-1".to_string()),
            kind: UploadWorkKind::Upload,
        };
        let tags = metadata.tags();

        assert_eq!(tags[0], TAG_UPLOAD);
        assert!(tags.contains(&"key:a2V5LTE=".to_string()));
        assert_eq!(metadata_from(&tags), metadata);
    }

    #[test]
    fn test_missing_kind_defaults_to_upload() {
        let tags = vec![
            TAG_POLL.to_string(),
            format!("{}{}", PREFIX_KEY, encode("key-2")),
            format!("{}%%%", PREFIX_DISPLAY_NAME),
        ];
        let metadata = metadata_from(&tags);

        assert_eq!(metadata.kind, UploadWorkKind::Upload);
        assert_eq!(metadata.idempotency_key.as_deref(), Some("key-2"));
        assert_eq!(metadata.display_name, None);
        assert_eq!(metadata.uri, None);
    }

    #[test]
    fn test_poll_kind_round_trips() {
        let metadata = UploadWorkMetadata {
            kind: UploadWorkKind::Poll,
            ..Default::default()
        };
        assert_eq!(metadata_from(&metadata.tags()).kind, UploadWorkKind::Poll);
    }

    #[test]
    fn test_unique_name_is_stable_sha1_of_uri() {
        let name = unique_name_for_uri(&uri());
        assert!(name.starts_with("upload:"));
        assert_eq!(name.len(), "upload:".len() + 40);
        assert_eq!(name, unique_name_for_uri(&uri()));

        let other = ContentUri::parse("content://media/external/images/media/43").unwrap();
        assert_ne!(name, unique_name_for_uri(&other));
    }
}
