//! Shared build state.
//!
//! One [`BuildInternals`] lives for a whole build invocation and is passed
//! explicitly to each stage. The client pass fills the entry map and page
//! metadata; the SSR plugin's `generate_bundle` records static files and
//! extracts the entry chunk; the manifest builder only reads.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::bundle::OutputChunk;
use crate::{Result, SsrError};

// ---------------------------------------------------------------------------
// Page metadata
// ---------------------------------------------------------------------------

/// The hoisted client script of a page: either inline code or the path of
/// a bundled file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HoistedScript {
    Inline { value: String },
    External { value: String },
}

impl HoistedScript {
    pub fn value(&self) -> &str {
        match self {
            HoistedScript::Inline { value } | HoistedScript::External { value } => value,
        }
    }

    /// Same kind, different value.
    pub fn with_value(&self, value: String) -> Self {
        match self {
            HoistedScript::Inline { .. } => HoistedScript::Inline { value },
            HoistedScript::External { .. } => HoistedScript::External { value },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StylesheetAsset {
    Inline { content: String },
    External { src: String },
}

impl StylesheetAsset {
    pub fn is_inline(&self) -> bool {
        matches!(self, StylesheetAsset::Inline { .. })
    }
}

/// A stylesheet plus where it was found in the module graph.
///
/// `order` is the import order within the page (`-1` when unknown) and
/// `depth` the distance from the page module (`-1` when unknown).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleEntry {
    pub depth: i32,
    pub order: i32,
    pub sheet: StylesheetAsset,
}

/// Compiled metadata for one page component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    pub component: String,
    #[serde(default)]
    pub hoisted_script: Option<HoistedScript>,
    #[serde(default)]
    pub styles: Vec<StyleEntry>,
}

impl PageData {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropagationHint {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "self")]
    SelfOnly,
    #[serde(rename = "in-tree")]
    InTree,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMetadata {
    pub propagation: PropagationHint,
    pub contains_head: bool,
}

// ---------------------------------------------------------------------------
// BuildInternals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildInternals {
    /// Logical entry specifier → emitted bundle file.
    pub entry_specifier_to_bundle_map: IndexMap<String, String>,
    /// Every static output file name, client and server.
    pub static_files: IndexSet<String>,
    /// Component identity → compiled page metadata.
    pub pages_by_component: IndexMap<String, PageData>,
    /// The compiled virtual SSR entry, once the server pass has run.
    #[serde(skip)]
    pub ssr_entry_chunk: Option<OutputChunk>,
    pub component_metadata: IndexMap<String, ComponentMetadata>,
}

impl BuildInternals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&mut self, page: PageData) {
        self.pages_by_component.insert(page.component.clone(), page);
    }

    pub fn page_for_component(&self, component: &str) -> Option<&PageData> {
        self.pages_by_component.get(component)
    }

    /// Returns `false` if the file was already recorded.
    pub fn add_static_file(&mut self, file: impl Into<String>) -> bool {
        self.static_files.insert(file.into())
    }

    pub fn set_bundle_entry(&mut self, specifier: impl Into<String>, file: impl Into<String>) {
        self.entry_specifier_to_bundle_map
            .insert(specifier.into(), file.into());
    }

    /// Store the SSR entry chunk, returning a previously stored one.
    pub fn set_ssr_entry_chunk(&mut self, chunk: OutputChunk) -> Option<OutputChunk> {
        self.ssr_entry_chunk.replace(chunk)
    }

    pub fn ssr_entry_chunk(&self) -> Result<&OutputChunk> {
        self.ssr_entry_chunk.as_ref().ok_or(SsrError::MissingEntryChunk)
    }

    pub fn ssr_entry_chunk_mut(&mut self) -> Result<&mut OutputChunk> {
        self.ssr_entry_chunk.as_mut().ok_or(SsrError::MissingEntryChunk)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
