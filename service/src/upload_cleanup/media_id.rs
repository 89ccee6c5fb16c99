use core_types::{ContentUri, content_uri::percent_decode};

/// Extracts a numeric media id from a raw value.
///
/// The value is percent decoded and then read as a whole number, as the part after the last
/// `:`, or as the part after the last `/`, in that order.
pub fn extract_media_id(raw: &str) -> Option<i64> {
    let decoded = percent_decode(raw.trim());
    let decoded = decoded.trim();
    if decoded.is_empty() {
        return None;
    }
    if let Ok(id) = decoded.parse::<i64>() {
        return Some(id);
    }
    if let Some(id) = decoded
        .rsplit_once(':')
        .and_then(|(_, tail)| tail.parse::<i64>().ok())
    {
        return Some(id);
    }
    decoded
        .rsplit_once('/')
        .and_then(|(_, tail)| tail.parse::<i64>().ok())
}

/// Media id of a URI: its last path segment first, then the whole string.
pub fn media_id_from_uri(uri: &ContentUri) -> Option<i64> {
    uri.last_path_segment()
        .and_then(extract_media_id)
        .or_else(|| extract_media_id(uri.as_str()))
}
