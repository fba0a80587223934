//! Utility functions for SSR manifest weaving.
//!
//! - Virtual module ID constants
//! - JS string escaping (injection-safe)
//! - URL path joining and asset prefixing

// ---------------------------------------------------------------------------
// Virtual Module IDs
// ---------------------------------------------------------------------------

/// Public specifier of the synthesized SSR entry.
pub const SSR_VIRTUAL_ENTRY_ID: &str = "zenith:ssr-entry";

/// Resolved (internal) id of the synthesized SSR entry. The `\0` prefix
/// keeps other plugins and the filesystem resolver away from it.
pub const RESOLVED_SSR_VIRTUAL_ENTRY_ID: &str = "\0zenith:ssr-entry";

/// Page registry module. Exports `pageMap`, `renderers` and, when enabled,
/// `middleware`.
pub const PAGES_VIRTUAL_MODULE_ID: &str = "zenith:pages";

/// Module exporting `deserializeManifest`.
pub const APP_MODULE_ID: &str = "zenith/app";

/// Module exporting the process-wide manifest setter.
pub const SSR_MANIFEST_MODULE_ID: &str = "zenith:ssr-manifest";

/// Entry specifier of the bundled `page`-stage client script.
pub const PAGE_SCRIPT_ID: &str = "zenith:scripts/page.js";

/// Entry specifier of the bundled `before-hydration` client script.
pub const BEFORE_HYDRATION_SCRIPT_ID: &str = "zenith:scripts/before-hydration.js";

/// Sentinel string literal replaced by the serialized manifest.
pub const MANIFEST_REPLACE: &str = "@@ZENITH_MANIFEST_REPLACE@@";

// ---------------------------------------------------------------------------
// JS String Escaping
// ---------------------------------------------------------------------------

/// Escape a string for safe embedding inside a single- or double-quoted
/// JS string literal.
pub fn escape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// URL Paths
// ---------------------------------------------------------------------------

pub fn prepend_forward_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

pub fn append_forward_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

pub fn remove_leading_forward_slash(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

pub fn remove_trailing_forward_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

/// Join URL path segments with `/`.
///
/// Only one slash is trimmed at each joint: the first segment loses a
/// trailing slash, the last a leading one, and middle segments both.
/// Nothing is normalized beyond that.
pub fn join_paths(paths: &[&str]) -> String {
    let last = paths.len().saturating_sub(1);
    paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            if i == 0 {
                remove_trailing_forward_slash(path)
            } else if i == last {
                remove_leading_forward_slash(path)
            } else {
                remove_trailing_forward_slash(remove_leading_forward_slash(path))
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Prefix a build-relative asset path for use in the manifest.
///
/// With a non-empty assets prefix the path is joined onto it as-is; otherwise it is
/// joined onto `base` and forced to start with `/`.
pub fn prefix_asset_path(assets_prefix: Option<&str>, base: &str, path: &str) -> String {
    match assets_prefix {
        Some(prefix) if !prefix.is_empty() => join_paths(&[prefix, path]),
        _ => prepend_forward_slash(&join_paths(&[base, path])),
    }
}

/// POSIX `dirname` for URL pathnames. Trailing slashes are ignored.
pub fn posix_dirname(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.starts_with('/') { "/" } else { "." };
    }
    match trimmed.rfind('/') {
        Some(0) => "/",
        Some(idx) => &trimmed[..idx],
        None => ".",
    }
}

/// POSIX `basename` for URL pathnames. Trailing slashes are ignored.
pub fn posix_basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
