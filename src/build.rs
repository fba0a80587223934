//! SSR build plugin: the two lifecycle hooks the outer build calls.
//!
//! - `before_build` attaches [`SsrEntryPlugin`] to the server bundler, but
//!   only when the build produces server output.
//! - `after_build` renames the extracted entry chunk, builds and injects
//!   the manifest, and commits the new code.
//!
//! The ordering is fixed: the client pass must be fully written and the
//! server pass must have produced the entry chunk before `after_build`.

use std::fmt;
use std::sync::Arc;

use crate::bundle::{BuildTarget, ChunkMutator};
use crate::config::{OutputMode, SsrConfig};
use crate::inject::inject_manifest;
use crate::internals::BuildInternals;
use crate::manifest::SerializedSsrManifest;
use crate::plugin::SsrEntryPlugin;
use crate::routes::RouteData;
use crate::{Result, SsrError};

// ---------------------------------------------------------------------------
// StaticBuildOptions
// ---------------------------------------------------------------------------

/// Everything a build knows up front: configuration plus the route table.
#[derive(Debug, Clone)]
pub struct StaticBuildOptions {
    pub config: SsrConfig,
    pub routes: Vec<RouteData>,
}

impl StaticBuildOptions {
    pub fn new(config: SsrConfig, routes: Vec<RouteData>) -> Self {
        Self { config, routes }
    }

    /// Server output, or hybrid output with at least one on-demand route.
    pub fn ssr_applies(&self) -> bool {
        match self.config.output {
            OutputMode::Server => true,
            OutputMode::Hybrid if self.config.is_hybrid_output() => {
                self.routes.iter().any(|route| !route.prerender)
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Integration hooks
// ---------------------------------------------------------------------------

/// An integration notified with the finished manifest before it is
/// injected. Returning an error aborts the build.
pub trait SsrBuildHook: Send + Sync {
    fn name(&self) -> &str;

    fn build_ssr(&self, manifest: &SerializedSsrManifest) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// SsrBuildPlugin
// ---------------------------------------------------------------------------

/// Where a bundler plugin is placed relative to user plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enforce {
    BeforeUserPlugins,
    AfterUserPlugins,
}

/// Result of `build:before`.
#[derive(Debug, Clone)]
pub struct BeforeBuildHook {
    pub enforce: Enforce,
    /// `None` when the build has no server output.
    pub plugin: Option<SsrEntryPlugin>,
}

pub struct SsrBuildPlugin {
    options: StaticBuildOptions,
    ssr: bool,
    hooks: Vec<Arc<dyn SsrBuildHook>>,
}

impl fmt::Debug for SsrBuildPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SsrBuildPlugin")
            .field("ssr", &self.ssr)
            .field("routes", &self.options.routes.len())
            .field(
                "hooks",
                &self.hooks.iter().map(|hook| hook.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl SsrBuildPlugin {
    pub fn new(options: StaticBuildOptions) -> Self {
        let ssr = options.ssr_applies();
        Self {
            options,
            ssr,
            hooks: Vec::new(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn SsrBuildHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn is_ssr(&self) -> bool {
        self.ssr
    }

    pub fn options(&self) -> &StaticBuildOptions {
        &self.options
    }

    /// `build:before`: create the bundler plugin when SSR applies.
    pub fn before_build(&self) -> Result<BeforeBuildHook> {
        let plugin = if self.ssr {
            let adapter = self
                .options
                .config
                .adapter
                .clone()
                .ok_or(SsrError::MissingAdapter)?;
            tracing::debug!(adapter = %adapter.name, "attaching SSR entry plugin");
            let middleware = self.options.config.experimental.middleware;
            Some(SsrEntryPlugin::new(adapter).with_middleware(middleware))
        } else {
            tracing::debug!("no server output; SSR entry plugin not attached");
            None
        };

        Ok(BeforeBuildHook {
            enforce: plugin
                .as_ref()
                .map_or(Enforce::AfterUserPlugins, SsrEntryPlugin::enforce),
            plugin,
        })
    }

    /// `build:post`: finalize the SSR entry chunk and commit its code.
    pub async fn after_build<M>(
        &self,
        internals: &mut BuildInternals,
        mutator: &mut M,
    ) -> Result<()>
    where
        M: ChunkMutator + ?Sized,
    {
        if !self.ssr {
            return Ok(());
        }

        let server_entry = &self.options.config.build.server_entry;
        internals.ssr_entry_chunk_mut()?.file_name = server_entry.clone();

        let code = inject_manifest(&self.options, internals, &self.hooks).await?;

        let chunk = internals.ssr_entry_chunk_mut()?;
        chunk.code = code.clone();
        mutator.mutate(chunk, BuildTarget::Server, code)?;
        tracing::info!(file = %server_entry, "SSR entry finalized");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterDescriptor;

    fn options(output: OutputMode, routes: Vec<RouteData>) -> StaticBuildOptions {
        StaticBuildOptions::new(
            SsrConfig {
                output,
                adapter: Some(AdapterDescriptor::new("test", "test/server.js")),
                ..Default::default()
            },
            routes,
        )
    }

    #[test]
    fn server_output_is_ssr() {
        assert!(options(OutputMode::Server, Vec::new()).ssr_applies());
    }

    #[test]
    fn static_output_is_not_ssr() {
        let routes = vec![RouteData::page("/", "index")];
        assert!(!options(OutputMode::Static, routes).ssr_applies());
    }

    #[test]
    fn hybrid_needs_flag_and_on_demand_route() {
        let on_demand = vec![
            RouteData::page("/", "index").with_prerender(true),
            RouteData::page("/api", "api"),
        ];
        let all_prerendered = vec![RouteData::page("/", "index").with_prerender(true)];

        let mut opts = options(OutputMode::Hybrid, on_demand.clone());
        assert!(!opts.ssr_applies());
        opts.config.experimental.hybrid_output = true;
        assert!(opts.ssr_applies());

        let mut opts = options(OutputMode::Hybrid, all_prerendered);
        opts.config.experimental.hybrid_output = true;
        assert!(!opts.ssr_applies());
    }

    #[test]
    fn before_build_attaches_plugin_with_middleware() {
        let mut opts = options(OutputMode::Server, Vec::new());
        opts.config.experimental.middleware = true;
        let hook = SsrBuildPlugin::new(opts).before_build().unwrap();
        assert_eq!(hook.enforce, Enforce::AfterUserPlugins);
        let plugin = hook.plugin.unwrap();
        let code = plugin.load("\0zenith:ssr-entry").unwrap();
        assert!(code.contains("middleware: _main.middleware"));
    }

    #[test]
    fn before_build_requires_adapter_for_ssr() {
        let mut opts = options(OutputMode::Server, Vec::new());
        opts.config.adapter = None;
        let err = SsrBuildPlugin::new(opts).before_build().unwrap_err();
        assert!(matches!(err, SsrError::MissingAdapter));
    }

    #[test]
    fn before_build_without_ssr_attaches_nothing() {
        let hook = SsrBuildPlugin::new(options(OutputMode::Static, Vec::new()))
            .before_build()
            .unwrap();
        assert!(hook.plugin.is_none());
    }
}
