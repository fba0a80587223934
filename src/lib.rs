//! # Zenith SSR
//!
//! Build-time manifest weaving for server output. The crate synthesizes a
//! virtual server entry, tracks its compiled chunk through the client and
//! server bundling passes, builds the SSR manifest (routes, scripts,
//! styles, static assets) and injects it into the final server entry by
//! replacing a placeholder string literal.
//!
//! The bundler itself is an external collaborator. Its boundary is modeled
//! by [`bundle::Output`] and the hooks on [`plugin::SsrEntryPlugin`]; the
//! `rolldown` feature wires the same hooks into Rolldown.

pub mod build;
pub mod bundle;
pub mod config;
pub mod entry;
pub mod inject;
pub mod internals;
pub mod manifest;
pub mod plugin;
pub mod routes;
pub mod utils;

#[cfg(feature = "napi")]
pub mod napi;

use thiserror::Error;

pub use build::{BeforeBuildHook, Enforce, SsrBuildHook, SsrBuildPlugin, StaticBuildOptions};
pub use bundle::{BuildTarget, ChunkMutator, Output, OutputAsset, OutputChunk, PendingMutations};
pub use config::{AdapterDescriptor, OutputMode, SsrConfig, StartHook};
pub use entry::generate_ssr_entry;
pub use inject::{inject_manifest, replace_manifest_token};
pub use internals::{BuildInternals, PageData};
pub use manifest::{build_manifest, SerializedRouteInfo, SerializedSsrManifest};
pub use plugin::SsrEntryPlugin;
pub use routes::RouteData;

// ---------------------------------------------------------------------------
// SsrError
// ---------------------------------------------------------------------------

/// Errors that abort the build.
#[derive(Debug, Error)]
pub enum SsrError {
    /// The virtual SSR entry never made it into the module graph.
    #[error("Did not generate an entry chunk for SSR")]
    MissingEntryChunk,

    #[error("Server output requires an adapter, but none is configured")]
    MissingAdapter,

    #[error("Integration hook `{hook}` failed: {message}")]
    HookFailed { hook: String, message: String },

    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Build failed: {0}")]
    BuildError(String),
}

pub type Result<T, E = SsrError> = std::result::Result<T, E>;
