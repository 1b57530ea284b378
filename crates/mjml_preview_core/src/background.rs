//! Preview background color.

use once_cell::sync::Lazy;
use regex::Regex;

/// First tag mentioning `head`, usually `<head>`.
static HEAD_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<[^>\n]*head[^>\n]*>").expect("head tag regex is valid"));

/// Inserts a `<style>` block painting the page with `color` right after the
/// head tag.
///
/// HTML without a head tag is returned unmodified.
///
/// # Example
///
/// ```
/// use mjml_preview_core::background::set_background_color;
///
/// let html = set_background_color("<html><head></head></html>", Some("#fff"));
/// assert!(html.contains("background-color: #fff;"));
/// ```
pub fn set_background_color(html: &str, color: Option<&str>) -> String {
    let Some(color) = color else {
        return html.to_string();
    };

    let Some(head) = HEAD_TAG.find(html) else {
        return html.to_string();
    };

    let mut styled = String::with_capacity(html.len() + 80);
    styled.push_str(&html[..head.end()]);
    styled.push_str(&format!(
        "\n<style>\n  html, body {{ background-color: {color}; }}\n</style>"
    ));
    styled.push_str(&html[head.end()..]);
    styled
}
