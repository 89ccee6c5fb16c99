/// Integer API level of the platform the deletion flow runs on.
pub type PlatformVersion = u32;

pub const READ_MEDIA_IMAGES: &str = "android.permission.READ_MEDIA_IMAGES";
pub const READ_EXTERNAL_STORAGE: &str = "android.permission.READ_EXTERNAL_STORAGE";

/// First version with granular media permissions.
pub const GRANULAR_MEDIA_PERMISSIONS_VERSION: PlatformVersion = 33;
/// First version with batched delete requests.
pub const BATCHED_DELETE_VERSION: PlatformVersion = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionMode {
    /// One consent prompt per batch, the platform deletes on approval.
    Modern,
    /// Direct per item deletes, consent only on recoverable security errors.
    Legacy,
}

pub fn required_read_permission(version: PlatformVersion) -> &'static str {
    if version >= GRANULAR_MEDIA_PERMISSIONS_VERSION {
        READ_MEDIA_IMAGES
    } else {
        READ_EXTERNAL_STORAGE
    }
}

pub fn deletion_mode(version: PlatformVersion) -> DeletionMode {
    if version >= BATCHED_DELETE_VERSION {
        DeletionMode::Modern
    } else {
        DeletionMode::Legacy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_read_permission() {
        assert_eq!(required_read_permission(29), READ_EXTERNAL_STORAGE);
        assert_eq!(required_read_permission(32), READ_EXTERNAL_STORAGE);
        assert_eq!(required_read_permission(33), READ_MEDIA_IMAGES);
        assert_eq!(required_read_permission(34), READ_MEDIA_IMAGES);
    }

    #[test]
    fn test_deletion_mode() {
        assert_eq!(deletion_mode(28), DeletionMode::Legacy);
        assert_eq!(deletion_mode(29), DeletionMode::Legacy);
        assert_eq!(deletion_mode(30), DeletionMode::Modern);
        assert_eq!(deletion_mode(34), DeletionMode::Modern);
    }
}
