//! Storage key generation and sanitization.
//!
//! Caller-supplied file names are untrusted: they may carry spaces, unicode,
//! or path separators. Everything outside a small safe charset collapses to
//! `_` before the name becomes part of a key.

use uuid::Uuid;

/// Splits a file name into its stem and lowercased extension.
///
/// The extension is only recognized when it is non-empty, purely ASCII
/// alphanumeric, and leaves a non-empty stem; anything else (including path
/// separators smuggled after a dot) stays in the stem for sanitization.
pub(crate) fn split_name(name: &str) -> (&str, Option<String>) {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (stem, Some(ext.to_ascii_lowercase()))
        }
        _ => (name, None),
    }
}

/// Returns the lowercased extension of a file name, if any.
pub(crate) fn extension(name: &str) -> Option<String> {
    split_name(name).1
}

/// Lowercases a name stem and replaces every character outside `[a-z0-9_-]`
/// with `_`.
///
/// Empty input falls back to `"file"` so a key always has a basename.
#[must_use]
pub fn sanitize_stem(stem: &str) -> String {
    let sanitized: String = stem
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}

/// Storage key at exactly the sanitized name: `folder/stem.ext`.
///
/// Uniqueness is NOT guaranteed; used for upsert writes and for callers that
/// opted out of renaming.
#[must_use]
pub fn exact_key(folder: &str, name: &str) -> String {
    let (stem, ext) = split_name(name);
    join(folder, &with_ext(sanitize_stem(stem), ext))
}

/// Storage key with a fresh random token: `folder/stem-<token>.ext`.
///
/// The token is a 128-bit random value rendered as 32 lowercase hex chars,
/// giving practical uniqueness without a storage round trip. The
/// no-overwrite write remains the authoritative conflict check.
#[must_use]
pub fn unique_key(folder: &str, name: &str) -> String {
    let (stem, ext) = split_name(name);
    let token = Uuid::new_v4().simple();
    let stem = format!("{}-{token}", sanitize_stem(stem));
    join(folder, &with_ext(stem, ext))
}

fn with_ext(stem: String, ext: Option<String>) -> String {
    match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

fn join(folder: &str, basename: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        basename.to_string()
    } else {
        format!("{folder}/{basename}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("invoice", "invoice")]
    #[case("My Photo!!", "my_photo__")]
    #[case("UPPER-case_09", "upper-case_09")]
    #[case("日本語", "___")]
    #[case("", "file")]
    #[case("???", "___")]
    fn test_sanitize_stem(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_stem(input), expected);
    }

    #[test]
    fn test_exact_key() {
        assert_eq!(exact_key("thumbnails", "My Photo!!.PNG"), "thumbnails/my_photo__.png");
        assert_eq!(exact_key("site", "logo.svg"), "site/logo.svg");
    }

    #[test]
    fn test_exact_key_without_extension() {
        assert_eq!(exact_key("videos", "rawclip"), "videos/rawclip");
    }

    #[test]
    fn test_empty_folder_keeps_bare_basename() {
        assert_eq!(exact_key("", "a.png"), "a.png");
        assert_eq!(exact_key("/", "a.png"), "a.png");
    }

    #[test]
    fn test_folder_slashes_trimmed() {
        assert_eq!(exact_key("videos/", "clip.mp4"), "videos/clip.mp4");
        assert_eq!(exact_key("/videos", "clip.mp4"), "videos/clip.mp4");
    }

    #[test]
    fn test_path_separators_flattened() {
        let key = exact_key("site", "../../etc/passwd");
        assert_eq!(key, "site/______etc_passwd");
    }

    #[test]
    fn test_unique_key_structure() {
        let key = unique_key("thumbnails", "My Photo!!.PNG");
        let rest = key
            .strip_prefix("thumbnails/my_photo__-")
            .expect("sanitized prefix");
        let token = rest.strip_suffix(".png").expect("lowercased extension");
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_unique_keys_differ() {
        assert_ne!(unique_key("v", "a.mp4"), unique_key("v", "a.mp4"));
    }

    #[rstest]
    #[case("clip.MP4", Some("mp4"))]
    #[case("archive.tar.gz", Some("gz"))]
    #[case("noext", None)]
    #[case(".hidden", None)]
    #[case("weird./etc", None)]
    fn test_extension(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(extension(name).as_deref(), expected);
    }
}
