//! Terminal display width helpers.
//!
//! Provides ANSI-aware width calculation so label centering and title
//! clipping stay aligned even when callers hand us pre-styled strings.

/// Compute the display width of a string after stripping ANSI escapes.
pub fn display_width(text: &str) -> usize {
    let clean = strip_ansi_escapes::strip(text);
    let clean_str = String::from_utf8_lossy(&clean);
    unicode_width::UnicodeWidthStr::width(&*clean_str)
}

/// Center `text` within `width` cells, padding with spaces.
///
/// Text wider than the field is returned unchanged; the surface clips it.
pub fn center(text: &str, width: usize) -> String {
    let len = display_width(text);
    if len >= width {
        return text.to_string();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}
