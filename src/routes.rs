//! Route records from the route table, their manifest serialization, and
//! where prerendered routes land on disk.

use std::path::{Path, PathBuf};

use path_slash::PathExt;
use serde::{Deserialize, Serialize};

use crate::config::{BuildFormat, SsrConfig, TrailingSlash};
use crate::utils::{
    append_forward_slash, posix_basename, posix_dirname, remove_leading_forward_slash,
};

/// Pages rendered for HTTP status codes. In `directory` format these still
/// render to `<name>.html` rather than `<name>/index.html`.
const STATUS_CODE_PAGES: [&str; 2] = ["/404", "/500"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    Page,
    Endpoint,
}

/// One segment part, e.g. `[slug]` in `/blog/[slug]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePart {
    pub content: String,
    pub dynamic: bool,
    pub spread: bool,
}

/// A route from the route table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteData {
    pub route: String,
    #[serde(rename = "type")]
    pub route_type: RouteType,
    /// Source of the regex matching this route.
    pub pattern: String,
    #[serde(default)]
    pub params: Vec<String>,
    /// Component identity, used to look up [`crate::PageData`].
    pub component: String,
    /// Absent for dynamic routes that were not materialized.
    #[serde(default)]
    pub pathname: Option<String>,
    #[serde(default)]
    pub segments: Vec<Vec<RoutePart>>,
    #[serde(default)]
    pub prerender: bool,
}

impl RouteData {
    /// A static page route for `pathname` rendered by `component`.
    pub fn page(pathname: &str, component: impl Into<String>) -> Self {
        let segments = pathname
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                vec![RoutePart {
                    content: s.to_string(),
                    dynamic: false,
                    spread: false,
                }]
            })
            .collect();
        Self {
            route: pathname.to_string(),
            route_type: RouteType::Page,
            pattern: static_pattern(pathname),
            params: Vec::new(),
            component: component.into(),
            pathname: Some(pathname.to_string()),
            segments,
            prerender: false,
        }
    }

    pub fn with_prerender(mut self, prerender: bool) -> Self {
        self.prerender = prerender;
        self
    }

    pub fn with_type(mut self, route_type: RouteType) -> Self {
        self.route_type = route_type;
        self
    }
}

fn static_pattern(pathname: &str) -> String {
    let trimmed = pathname.trim_matches('/');
    if trimmed.is_empty() {
        return r"^\/$".into();
    }
    let escaped: Vec<String> = trimmed.split('/').map(regex::escape).collect();
    format!(r"^\/{}\/?$", escaped.join(r"\/"))
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    pub trailing_slash: TrailingSlash,
}

/// Route data as the runtime receives it: the route record plus `_meta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedRouteData {
    #[serde(flatten)]
    pub route: RouteData,
    #[serde(rename = "_meta")]
    pub meta: RouteMeta,
}

pub fn serialize_route_data(
    route: &RouteData,
    trailing_slash: TrailingSlash,
) -> SerializedRouteData {
    SerializedRouteData {
        route: route.clone(),
        meta: RouteMeta { trailing_slash },
    }
}

// ---------------------------------------------------------------------------
// Output layout
// ---------------------------------------------------------------------------

/// Directory a prerendered route is written to, under the client build root.
pub fn out_folder(config: &SsrConfig, pathname: &str, route_type: RouteType) -> PathBuf {
    let root = &config.build.client;
    let folder_of =
        |path: &str| root.join(remove_leading_forward_slash(&append_forward_slash(path)));
    let dirname_folder = || folder_of(posix_dirname(pathname));
    match route_type {
        RouteType::Endpoint => dirname_folder(),
        RouteType::Page => match config.build.format {
            BuildFormat::Directory => {
                if STATUS_CODE_PAGES.contains(&pathname) {
                    dirname_folder()
                } else {
                    folder_of(pathname)
                }
            }
            BuildFormat::File => {
                if pathname.is_empty() {
                    root.clone()
                } else {
                    dirname_folder()
                }
            }
        },
    }
}

/// File a prerendered route is written to, inside `out_folder`.
pub fn out_file(
    config: &SsrConfig,
    out_folder: &Path,
    pathname: &str,
    route_type: RouteType,
) -> PathBuf {
    let html_file = || {
        let base_name = posix_basename(pathname);
        let base_name = if base_name.is_empty() { "index" } else { base_name };
        out_folder.join(format!("{base_name}.html"))
    };
    match route_type {
        RouteType::Endpoint => out_folder.join(posix_basename(pathname)),
        RouteType::Page => match config.build.format {
            BuildFormat::Directory if !STATUS_CODE_PAGES.contains(&pathname) => {
                out_folder.join("index.html")
            }
            _ => html_file(),
        },
    }
}

/// `file` relative to the client build root, with forward slashes.
pub fn client_relative(config: &SsrConfig, file: &Path) -> String {
    let relative = file.strip_prefix(&config.build.client).unwrap_or(file);
    relative.to_slash_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
