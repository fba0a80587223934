//! SsrEntryPlugin - bundler hooks for the virtual SSR entry
//!
//! Hooks, in bundler lifecycle order:
//! 1. `options` - add the virtual entry to the bundler input
//! 2. `resolve_id` - map the public specifier to its `\0`-prefixed id
//! 3. `load` - serve the synthesized entry source
//! 4. `generate_bundle` - record static assets and pull the compiled entry
//!    chunk out of the output set into [`BuildInternals`]
//!
//! The `rolldown` feature exposes the same hooks as a Rolldown `Plugin`.

#[cfg(feature = "rolldown")]
pub mod rolldown;

use crate::build::Enforce;
use crate::bundle::{add_rollup_input, Output, RollupInput};
use crate::config::AdapterDescriptor;
use crate::entry::generate_ssr_entry;
use crate::internals::BuildInternals;
use crate::utils::{RESOLVED_SSR_VIRTUAL_ENTRY_ID, SSR_VIRTUAL_ENTRY_ID};

pub const PLUGIN_NAME: &str = "zenith:ssr";

/// The SSR entry plugin. Only attached when the build produces server output.
#[derive(Debug, Clone)]
pub struct SsrEntryPlugin {
    adapter: AdapterDescriptor,
    middleware: bool,
}

impl SsrEntryPlugin {
    pub fn new(adapter: AdapterDescriptor) -> Self {
        Self {
            adapter,
            middleware: false,
        }
    }

    pub fn with_middleware(mut self, middleware: bool) -> Self {
        self.middleware = middleware;
        self
    }

    pub fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    /// Runs after user plugins, so `generate_bundle` sees the final output set.
    pub fn enforce(&self) -> Enforce {
        Enforce::AfterUserPlugins
    }

    pub fn adapter(&self) -> &AdapterDescriptor {
        &self.adapter
    }

    /// Register the virtual entry as a bundler input.
    pub fn options(&self, input: Option<RollupInput>) -> RollupInput {
        add_rollup_input(input, &[SSR_VIRTUAL_ENTRY_ID])
    }

    pub fn resolve_id(&self, specifier: &str) -> Option<&'static str> {
        (specifier == SSR_VIRTUAL_ENTRY_ID).then_some(RESOLVED_SSR_VIRTUAL_ENTRY_ID)
    }

    pub fn load(&self, id: &str) -> Option<String> {
        (id == RESOLVED_SSR_VIRTUAL_ENTRY_ID)
            .then(|| generate_ssr_entry(&self.adapter, self.middleware))
    }

    /// Record every asset as a static file, then move the chunk built from
    /// the virtual entry out of `bundle` into `internals`. It gets its final
    /// name and code in `build:post`.
    pub fn generate_bundle(&self, internals: &mut BuildInternals, bundle: &mut Vec<Output>) {
        for output in bundle.iter() {
            if let Output::Asset(asset) = output {
                internals.add_static_file(asset.file_name.clone());
            }
        }

        let mut extracted = Vec::new();
        bundle.retain(|output| match output {
            Output::Chunk(chunk) if chunk.contains_module(RESOLVED_SSR_VIRTUAL_ENTRY_ID) => {
                extracted.push(chunk.clone());
                false
            }
            _ => true,
        });

        if extracted.len() > 1 {
            tracing::warn!(
                chunks = extracted.len(),
                "more than one chunk contains the SSR entry; keeping the last"
            );
        }
        if let Some(chunk) = extracted.pop() {
            tracing::debug!(file = %chunk.file_name, "extracted SSR entry chunk");
            internals.set_ssr_entry_chunk(chunk);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
