use crate::message::ParseMode;

/// Engine-wide defaults for flags no screen or group sets explicitly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub parse_mode: ParseMode,
    pub disable_web_page_preview: bool,
    /// Remote messages are silent unless something asks for a notification.
    pub enable_notification: bool,
    /// Whether the error placeholder shows the full error chain or a generic notice.
    pub detailed_errors: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parse_mode: ParseMode::Html,
            disable_web_page_preview: false,
            enable_notification: false,
            detailed_errors: true,
        }
    }
}
