use std::collections::HashMap;

use core_types::SettingName;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    pub auto_delete_after_upload: bool,
    pub wifi_only_uploads: bool,
}

fn parse_flag(map: &HashMap<String, String>, name: SettingName) -> bool {
    map.get(name.as_str())
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl From<HashMap<String, String>> for Settings {
    fn from(map: HashMap<String, String>) -> Self {
        Self {
            auto_delete_after_upload: parse_flag(&map, SettingName::AutoDeleteAfterUpload),
            wifi_only_uploads: parse_flag(&map, SettingName::WifiOnlyUploads),
        }
    }
}
