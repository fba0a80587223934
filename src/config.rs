//! Build configuration consumed by the SSR pipeline.
//!
//! Loaded from JSON (camelCase keys, unknown keys rejected). Everything the
//! manifest needs from the outer build lives here: output mode, base path,
//! assets prefix, markdown passthrough, client directives, injected scripts
//! and the adapter descriptor.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, SsrError};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Where pages are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Everything is prerendered at build time.
    #[default]
    Static,
    /// Everything is rendered on demand unless a route opts into prerendering.
    Server,
    /// Prerendered by default, with on-demand routes opting out.
    Hybrid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSlash {
    Always,
    Never,
    #[default]
    Ignore,
}

/// Layout of prerendered page files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildFormat {
    /// `/about` → `about/index.html`
    #[default]
    Directory,
    /// `/about` → `about.html`
    File,
}

/// Whether the adapter's server entrypoint exports a `start` function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartHook {
    Present,
    #[default]
    Absent,
}

/// When an injected script runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptStage {
    /// Inlined into the `<head>` of every page.
    HeadInline,
    /// Runs before any island hydrates.
    BeforeHydration,
    /// Bundled into the page-level client script.
    Page,
    /// Imported into the server-side page module.
    PageSsr,
}

// ---------------------------------------------------------------------------
// AdapterDescriptor
// ---------------------------------------------------------------------------

/// Identifies the server runtime target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AdapterDescriptor {
    pub name: String,
    /// Module specifier of the adapter's runtime module.
    pub server_entrypoint: String,
    /// Arbitrary JSON handed to `createExports` / `start`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    /// Names re-exported from `createExports(manifest, args)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<Vec<String>>,
    #[serde(default)]
    pub start_hook: StartHook,
}

impl AdapterDescriptor {
    pub fn new(name: impl Into<String>, server_entrypoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server_entrypoint: server_entrypoint.into(),
            args: None,
            exports: None,
            start_hook: StartHook::Absent,
        }
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = Some(args);
        self
    }

    pub fn with_exports<I, S>(mut self, exports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exports = Some(exports.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_start_hook(mut self, start_hook: StartHook) -> Self {
        self.start_hook = start_hook;
        self
    }

    pub fn has_start_hook(&self) -> bool {
        self.start_hook == StartHook::Present
    }

    /// Export names end up as `export const <name>`, so each must be a JS
    /// identifier (or `default`).
    fn validate(&self) -> Result<()> {
        if self.server_entrypoint.is_empty() {
            return Err(SsrError::ConfigError(format!(
                "adapter `{}` has an empty serverEntrypoint",
                self.name
            )));
        }
        for name in self.exports.iter().flatten() {
            if !is_export_name(name) {
                return Err(SsrError::ConfigError(format!(
                    "adapter `{}` declares export `{}`, which is not a valid identifier",
                    self.name, name
                )));
            }
        }
        Ok(())
    }
}

/// ECMAScript reserved words, plus the strict-mode and module-only ones.
const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// `default` is re-exported through an alias, so it is the one reserved
/// word allowed as an export name.
fn is_export_name(name: &str) -> bool {
    name == "default" || (is_js_identifier(name) && !RESERVED_WORDS.contains(&name))
}

fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

/// A script registered by an integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InjectedScript {
    pub stage: ScriptStage,
    pub content: String,
}

impl InjectedScript {
    pub fn new(stage: ScriptStage, content: impl Into<String>) -> Self {
        Self {
            stage,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Build + experimental sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct BuildConfig {
    /// Output directory of the client build.
    pub client: PathBuf,
    /// Output directory of the server build.
    pub server: PathBuf,
    /// File name of the finalized server entry.
    pub server_entry: String,
    /// When set, asset URLs are built on this instead of `base`.
    pub assets_prefix: Option<String>,
    pub format: BuildFormat,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            client: PathBuf::from("dist/client"),
            server: PathBuf::from("dist/server"),
            server_entry: "entry.mjs".into(),
            assets_prefix: None,
            format: BuildFormat::Directory,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ExperimentalFlags {
    pub middleware: bool,
    pub hybrid_output: bool,
}

// ---------------------------------------------------------------------------
// SsrConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SsrConfig {
    pub output: OutputMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    pub base: String,
    pub trailing_slash: TrailingSlash,
    pub build: BuildConfig,
    /// Passed through to the runtime untouched.
    pub markdown: Value,
    pub experimental: ExperimentalFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter: Option<AdapterDescriptor>,
    /// Names of the enabled `client:*` directives.
    pub client_directives: Vec<String>,
    pub scripts: Vec<InjectedScript>,
}

impl Default for SsrConfig {
    fn default() -> Self {
        Self {
            output: OutputMode::Static,
            site: None,
            base: "/".into(),
            trailing_slash: TrailingSlash::Ignore,
            build: BuildConfig::default(),
            markdown: Value::Object(Default::default()),
            experimental: ExperimentalFlags::default(),
            adapter: None,
            client_directives: Vec::new(),
            scripts: Vec::new(),
        }
    }
}

impl SsrConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(source: &str) -> Result<Self> {
        let config: SsrConfig = serde_json::from_str(source)
            .map_err(|e| SsrError::ConfigError(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            SsrError::ConfigError(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if self.build.server_entry.is_empty() {
            return Err(SsrError::ConfigError("build.serverEntry is empty".into()));
        }
        if let Some(adapter) = &self.adapter {
            adapter.validate()?;
        }
        Ok(())
    }

    /// Hybrid output only counts when the experimental flag enables it.
    pub fn is_hybrid_output(&self) -> bool {
        self.experimental.hybrid_output && self.output == OutputMode::Hybrid
    }

    pub fn scripts_with_stage(&self, stage: ScriptStage) -> impl Iterator<Item = &InjectedScript> {
        self.scripts.iter().filter(move |script| script.stage == stage)
    }

    pub fn has_page_script(&self) -> bool {
        self.scripts_with_stage(ScriptStage::Page).next().is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
