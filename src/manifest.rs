//! SSR manifest types and the manifest builder.
//!
//! The manifest is built once, after both bundling passes, from the shared
//! build state, the route table and the configuration. It is serialized to
//! JSON and embedded in the server entry; the runtime fills in `pageMap`
//! and `renderers` itself.

use std::cmp::Ordering;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::build::StaticBuildOptions;
use crate::config::ScriptStage;
use crate::internals::{
    BuildInternals, ComponentMetadata, HoistedScript, StyleEntry, StylesheetAsset,
};
use crate::routes::{
    client_relative, out_file, out_folder, serialize_route_data, SerializedRouteData,
};
use crate::utils::{prefix_asset_path, BEFORE_HYDRATION_SCRIPT_ID, PAGE_SCRIPT_ID};
use crate::{Result, SsrError};

// ---------------------------------------------------------------------------
// Manifest types
// ---------------------------------------------------------------------------

/// A script entry of a route: a page script (`{type, value}`) or a script
/// injected by an integration (`{stage, children}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestScript {
    Hoisted(HoistedScript),
    Injected { stage: ScriptStage, children: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedRouteInfo {
    /// Build-relative output file. Empty for on-demand routes.
    pub file: String,
    /// Reserved for `rel=modulepreload` and friends. Always empty.
    pub links: Vec<String>,
    pub scripts: Vec<ManifestScript>,
    pub styles: Vec<StylesheetAsset>,
    pub route_data: SerializedRouteData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedSsrManifest {
    pub adapter_name: String,
    pub routes: Vec<SerializedRouteInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    pub base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_prefix: Option<String>,
    pub markdown: Value,
    /// Always `null` here; set by the generated entry at startup.
    pub page_map: Option<Value>,
    /// Always empty here; set by the generated entry at startup.
    pub renderers: Vec<Value>,
    pub client_directives: Vec<String>,
    pub entry_modules: IndexMap<String, String>,
    pub component_metadata: Vec<(String, ComponentMetadata)>,
    pub assets: Vec<String>,
}

impl SerializedSsrManifest {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

/// Sort order for page styles.
///
/// Known import order wins over unknown (`-1`), lower order first. On equal
/// order, unknown depth (`-1`) comes first, then deeper modules.
pub fn css_order(a: &StyleEntry, b: &StyleEntry) -> Ordering {
    match (a.order, b.order) {
        (-1, other) if other >= 0 => Ordering::Greater,
        (other, -1) if other >= 0 => Ordering::Less,
        (oa, ob) if oa != ob => oa.cmp(&ob),
        _ => match (a.depth, b.depth) {
            (da, db) if da == db => Ordering::Equal,
            (-1, _) => Ordering::Less,
            (_, -1) => Ordering::Greater,
            (da, db) => db.cmp(&da),
        },
    }
}

/// Fold step that collapses consecutive inline sheets into one.
/// External sheets are never merged.
pub fn merge_inline_css(
    mut acc: Vec<StylesheetAsset>,
    current: StylesheetAsset,
) -> Vec<StylesheetAsset> {
    let last_is_inline = acc.last().is_some_and(StylesheetAsset::is_inline);
    match current {
        StylesheetAsset::Inline { content } if last_is_inline => {
            if let Some(StylesheetAsset::Inline { content: last }) = acc.last_mut() {
                last.push_str(&content);
            }
        }
        current => acc.push(current),
    }
    acc
}

/// Order a page's styles, prefix external sheets and merge inline ones.
pub fn page_styles(
    styles: &[StyleEntry],
    prefix: &dyn Fn(&str) -> String,
) -> Vec<StylesheetAsset> {
    let mut ordered: Vec<&StyleEntry> = styles.iter().collect();
    ordered.sort_by(|a, b| css_order(a, b));
    ordered
        .into_iter()
        .map(|entry| match &entry.sheet {
            StylesheetAsset::External { src } => StylesheetAsset::External { src: prefix(src) },
            inline => inline.clone(),
        })
        .fold(Vec::new(), merge_inline_css)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Build the SSR manifest.
///
/// `static_files` are build-relative paths of every static output file.
/// Prerendered routes come first, then on-demand routes, each group in
/// route-table order.
pub fn build_manifest(
    opts: &StaticBuildOptions,
    internals: &BuildInternals,
    static_files: Vec<String>,
) -> Result<SerializedSsrManifest> {
    let config = &opts.config;
    let adapter = config.adapter.as_ref().ok_or(SsrError::MissingAdapter)?;

    let mut static_files: IndexSet<String> = static_files.into_iter().collect();
    let mut entry_modules = internals.entry_specifier_to_bundle_map.clone();

    let prefix = |path: &str| {
        prefix_asset_path(config.build.assets_prefix.as_deref(), &config.base, path)
    };

    // The page-level client script stays an asset even when nothing else
    // references it.
    let page_script = config
        .has_page_script()
        .then(|| entry_modules.get(PAGE_SCRIPT_ID).cloned())
        .flatten();
    if let Some(src) = &page_script {
        static_files.insert(src.clone());
    }

    let mut routes = Vec::with_capacity(opts.routes.len());

    for route in opts.routes.iter().filter(|route| route.prerender) {
        let Some(pathname) = route.pathname.as_deref() else {
            continue;
        };
        let folder = out_folder(config, pathname, route.route_type);
        let file = client_relative(config, &out_file(config, &folder, pathname, route.route_type));
        routes.push(SerializedRouteInfo {
            file: file.clone(),
            links: Vec::new(),
            scripts: Vec::new(),
            styles: Vec::new(),
            route_data: serialize_route_data(route, config.trailing_slash),
        });
        static_files.insert(file);
    }

    for route in &opts.routes {
        if route.prerender {
            continue;
        }
        let Some(page) = internals.page_for_component(&route.component) else {
            tracing::debug!(component = %route.component, "no page data for on-demand route");
            continue;
        };

        let mut scripts = Vec::new();
        if let Some(hoisted) = &page.hoisted_script {
            let value = hoisted.value();
            let value = if value.ends_with(".js") {
                prefix(value)
            } else {
                value.to_string()
            };
            scripts.push(ManifestScript::Hoisted(hoisted.with_value(value)));
        }
        if let Some(src) = &page_script {
            scripts.push(ManifestScript::Hoisted(HoistedScript::External {
                value: prefix(src),
            }));
        }
        scripts.extend(
            config
                .scripts_with_stage(ScriptStage::HeadInline)
                .map(|script| ManifestScript::Injected {
                    stage: script.stage,
                    children: script.content.clone(),
                }),
        );

        routes.push(SerializedRouteInfo {
            file: String::new(),
            links: Vec::new(),
            scripts,
            styles: page_styles(&page.styles, &prefix),
            route_data: serialize_route_data(route, config.trailing_slash),
        });
    }

    // No hydrated components means no before-hydration bundle. An empty
    // entry tells the runtime not to load it.
    if !entry_modules.contains_key(BEFORE_HYDRATION_SCRIPT_ID) {
        entry_modules.insert(BEFORE_HYDRATION_SCRIPT_ID.to_string(), String::new());
    }

    tracing::debug!(
        routes = routes.len(),
        assets = static_files.len(),
        "built SSR manifest"
    );

    Ok(SerializedSsrManifest {
        adapter_name: adapter.name.clone(),
        routes,
        site: config.site.clone(),
        base: config.base.clone(),
        assets_prefix: config.build.assets_prefix.clone(),
        markdown: config.markdown.clone(),
        page_map: None,
        renderers: Vec::new(),
        client_directives: config.client_directives.clone(),
        entry_modules,
        component_metadata: internals
            .component_metadata
            .iter()
            .map(|(id, meta)| (id.clone(), meta.clone()))
            .collect(),
        assets: static_files.iter().map(|file| prefix(file)).collect(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(depth: i32, order: i32, sheet: StylesheetAsset) -> StyleEntry {
        StyleEntry { depth, order, sheet }
    }

    fn inline(content: &str) -> StylesheetAsset {
        StylesheetAsset::Inline {
            content: content.into(),
        }
    }

    fn external(src: &str) -> StylesheetAsset {
        StylesheetAsset::External { src: src.into() }
    }

    #[test]
    fn css_order_prefers_known_order() {
        let known = entry(0, 3, inline("a"));
        let unknown = entry(0, -1, inline("b"));
        assert_eq!(css_order(&known, &unknown), Ordering::Less);
        assert_eq!(css_order(&unknown, &known), Ordering::Greater);
        assert_eq!(
            css_order(&entry(0, 1, inline("")), &entry(0, 2, inline(""))),
            Ordering::Less
        );
    }

    #[test]
    fn css_order_ties_break_on_depth() {
        let shallow = entry(0, 1, inline(""));
        let deep = entry(2, 1, inline(""));
        let unknown_depth = entry(-1, 1, inline(""));
        assert_eq!(css_order(&deep, &shallow), Ordering::Less);
        assert_eq!(css_order(&unknown_depth, &deep), Ordering::Less);
        assert_eq!(css_order(&deep, &unknown_depth), Ordering::Greater);
        assert_eq!(css_order(&shallow, &shallow.clone()), Ordering::Equal);
    }

    #[test]
    fn merge_collapses_adjacent_inline_only() {
        let merged = vec![inline("a{}"), inline("b{}"), external("/x.css"), inline("c{}")]
            .into_iter()
            .fold(Vec::new(), merge_inline_css);
        assert_eq!(
            merged,
            vec![inline("a{}b{}"), external("/x.css"), inline("c{}")]
        );
    }

    #[test]
    fn merge_is_idempotent_on_merged_list() {
        let merged = vec![inline("a{}"), external("/x.css"), inline("c{}"), external("/y.css")];
        let again = merged.clone().into_iter().fold(Vec::new(), merge_inline_css);
        assert_eq!(again, merged);
    }

    #[test]
    fn merge_never_joins_external_sheets() {
        let merged = vec![external("/a.css"), external("/b.css")]
            .into_iter()
            .fold(Vec::new(), merge_inline_css);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn page_styles_sorts_prefixes_and_merges() {
        let styles = vec![
            entry(0, -1, inline("late{}")),
            entry(0, 1, external("assets/b.css")),
            entry(1, 0, inline("x{}")),
            entry(0, 0, inline("y{}")),
        ];
        let prefix = |path: &str| format!("/base/{path}");
        let result = page_styles(&styles, &prefix);
        assert_eq!(
            result,
            vec![
                inline("x{}y{}"),
                external("/base/assets/b.css"),
                inline("late{}"),
            ]
        );
    }

    #[test]
    fn manifest_script_wire_shapes() {
        let hoisted = ManifestScript::Hoisted(HoistedScript::External {
            value: "/a.js".into(),
        });
        assert_eq!(
            serde_json::to_string(&hoisted).unwrap(),
            r#"{"type":"external","value":"/a.js"}"#
        );
        let injected = ManifestScript::Injected {
            stage: ScriptStage::HeadInline,
            children: "console.log(1)".into(),
        };
        assert_eq!(
            serde_json::to_string(&injected).unwrap(),
            r#"{"stage":"head-inline","children":"console.log(1)"}"#
        );
    }
}
