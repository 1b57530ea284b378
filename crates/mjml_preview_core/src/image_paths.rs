//! Image path rewriting.
//!
//! The preview surface has no notion of the document's directory, so relative
//! image sources are rewritten to absolute paths before the HTML is shown.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::{Component, Path, PathBuf};

static IMG_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(<img\b[^>]*?\ssrc\s*=\s*)(?:"([^"]*)"|'([^']*)')"#)
        .expect("image source regex is valid")
});

static URL_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*:").expect("URL scheme regex is valid"));

/// Returns `true` if `src` must be left alone: URLs of any scheme (`http:`,
/// `data:`, `cid:`...), protocol-relative and absolute paths.
fn is_absolute_source(src: &str) -> bool {
    src.is_empty()
        || src.starts_with('/')
        || src.starts_with('\\')
        || Path::new(src).is_absolute()
        || URL_SCHEME.is_match(src)
}

/// Resolves `.` and `..` without touching the file system.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Rewrites relative `<img src>` values to absolute paths resolved against
/// the directory of `document_path`.
///
/// # Example
///
/// ```
/// use mjml_preview_core::image_paths::fix_images;
/// use std::path::Path;
///
/// let html = r#"<img src="images/logo.png">"#;
/// let fixed = fix_images(html, Path::new("/work/mail/welcome.mjml"));
/// assert!(fixed.contains("/work/mail/images/logo.png"));
/// ```
pub fn fix_images(html: &str, document_path: &Path) -> String {
    let Some(base_dir) = document_path.parent() else {
        return html.to_string();
    };

    IMG_SRC
        .replace_all(html, |caps: &Captures| {
            let prefix = &caps[1];
            let (quote, src) = match (caps.get(2), caps.get(3)) {
                (Some(src), _) => ('"', src.as_str()),
                (None, Some(src)) => ('\'', src.as_str()),
                (None, None) => return caps[0].to_string(),
            };

            if is_absolute_source(src) {
                return caps[0].to_string();
            }

            let resolved = normalize(&base_dir.join(src));
            format!("{prefix}{quote}{}{quote}", resolved.display())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = "/work/mail/welcome.mjml";

    fn fix(html: &str) -> String {
        fix_images(html, Path::new(DOCUMENT))
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_relative_paths() {
        assert_eq!(
            fix(r#"<img alt="logo" src="images/logo.png" width="100">"#),
            r#"<img alt="logo" src="/work/mail/images/logo.png" width="100">"#
        );
        assert_eq!(
            fix(r#"<img src='./logo.png'/>"#),
            r#"<img src='/work/mail/logo.png'/>"#
        );
        assert_eq!(
            fix(r#"<IMG SRC="../shared/banner.jpg">"#),
            r#"<IMG SRC="/work/shared/banner.jpg">"#
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_every_image() {
        let html = r#"<p><img src="a.png"></p><img src="https://example.com/b.png"><img src="c.png">"#;
        assert_eq!(
            fix(html),
            r#"<p><img src="/work/mail/a.png"></p><img src="https://example.com/b.png"><img src="/work/mail/c.png">"#
        );
    }

    #[test]
    fn test_preserve_absolute_urls() {
        for html in [
            r#"<img src="https://example.com/image.png">"#,
            r#"<img src="http://example.com/image.png">"#,
            r#"<img src="data:image/png;base64,abc123">"#,
            r#"<img src="cid:logo@mail">"#,
            r#"<img src="file:///tmp/logo.png">"#,
            r#"<img src="//cdn.example.com/image.png">"#,
            r#"<img src="/absolute/path/image.png">"#,
            r#"<img src="">"#,
        ] {
            assert_eq!(fix(html), html);
        }
    }

    #[test]
    fn test_malformed_html_passes_through() {
        let html = r#"<img src="unterminated.png <p>text</p>"#;
        assert_eq!(fix(html), html);
        assert_eq!(fix("<div data-src=\"x.png\">"), "<div data-src=\"x.png\">");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/../../c")), PathBuf::from("/c"));
        assert_eq!(normalize(Path::new("../a")), PathBuf::from("../a"));
    }
}
