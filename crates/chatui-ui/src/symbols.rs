//! Markup fragments the remote side renders specially.

/// Braille blank: a visible-width character for otherwise empty button labels.
pub const EMPTY: &str = "\u{2800}";

/// Zero-width non-joiner as an HTML entity. Keeps leading and trailing spaces of a text
/// from being trimmed.
pub const ZW: &str = "&#8204;";

/// Strips what a keyboard label cannot carry: line breaks, zero-width marks and HTML
/// escapes of angle brackets.
pub fn keyboard_label(text: &str) -> String {
    let label = text
        .replace('\n', "")
        .replace(ZW, "")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    if label.is_empty() {
        EMPTY.to_owned()
    } else {
        label
    }
}
