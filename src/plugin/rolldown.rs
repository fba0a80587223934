//! Rolldown binding for [`SsrEntryPlugin`].
//!
//! Rolldown hooks only get `&self`, so the build state is shared through
//! `Arc<Mutex<_>>`. `generate_bundle` is the only hook that takes the lock.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Mutex};

use arcstr::ArcStr;
use rolldown::InputItem;
use rolldown_common::{Output, ResolvedExternal};
use rolldown_plugin::{
    HookGenerateBundleArgs, HookLoadArgs, HookLoadOutput, HookResolveIdArgs,
    HookResolveIdOutput, HookUsage, Plugin, PluginContext, PluginHookMeta, PluginOrder,
    SharedLoadPluginContext,
};

use crate::build::Enforce;
use crate::bundle::OutputChunk;
use crate::internals::BuildInternals;
use crate::plugin::{SsrEntryPlugin, PLUGIN_NAME};
use crate::utils::{RESOLVED_SSR_VIRTUAL_ENTRY_ID, SSR_VIRTUAL_ENTRY_ID};

pub struct RolldownSsrPlugin {
    inner: SsrEntryPlugin,
    internals: Arc<Mutex<BuildInternals>>,
}

impl fmt::Debug for RolldownSsrPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RolldownSsrPlugin")
            .field("inner", &self.inner)
            .finish()
    }
}

impl RolldownSsrPlugin {
    pub fn new(inner: SsrEntryPlugin, internals: Arc<Mutex<BuildInternals>>) -> Self {
        Self { inner, internals }
    }

    /// Shared build state (for reading the entry chunk after the build).
    pub fn internals(&self) -> Arc<Mutex<BuildInternals>> {
        Arc::clone(&self.internals)
    }

    fn extract_entry(&self, bundle: &mut Vec<Output>) -> anyhow::Result<()> {
        let mut internals = self
            .internals
            .lock()
            .map_err(|_| anyhow::anyhow!("build internals lock poisoned"))?;

        for output in bundle.iter() {
            if let Output::Asset(asset) = output {
                internals.add_static_file(asset.filename.to_string());
            }
        }

        let mut extracted = None;
        bundle.retain(|output| match output {
            Output::Chunk(chunk)
                if chunk
                    .module_ids
                    .iter()
                    .any(|id| id.as_str() == RESOLVED_SSR_VIRTUAL_ENTRY_ID) =>
            {
                extracted = Some(OutputChunk {
                    file_name: chunk.filename.to_string(),
                    code: chunk.code.clone(),
                    module_ids: chunk.module_ids.iter().map(|id| id.to_string()).collect(),
                    is_entry: chunk.is_entry,
                });
                false
            }
            _ => true,
        });

        if let Some(chunk) = extracted {
            internals.set_ssr_entry_chunk(chunk);
        }
        Ok(())
    }
}

/// Add the virtual SSR entry to Rolldown's input items.
pub fn with_ssr_input(mut input: Vec<InputItem>) -> Vec<InputItem> {
    input.push(InputItem {
        name: Some(SSR_VIRTUAL_ENTRY_ID.into()),
        import: SSR_VIRTUAL_ENTRY_ID.into(),
    });
    input
}

impl Plugin for RolldownSsrPlugin {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(PLUGIN_NAME)
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load | HookUsage::GenerateBundle
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = rolldown_plugin::HookResolveIdReturn> + Send {
        let resolved = self.inner.resolve_id(args.specifier);

        async move {
            Ok(resolved.map(|id| HookResolveIdOutput {
                id: ArcStr::from(id),
                external: Some(ResolvedExternal::Bool(false)),
                ..Default::default()
            }))
        }
    }

    fn load(
        &self,
        _ctx: SharedLoadPluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = rolldown_plugin::HookLoadReturn> + Send {
        let code = self.inner.load(args.id);

        async move {
            Ok(code.map(|code| HookLoadOutput {
                code: ArcStr::from(code),
                ..Default::default()
            }))
        }
    }

    fn generate_bundle_meta(&self) -> Option<PluginHookMeta> {
        let order = match self.inner.enforce() {
            Enforce::BeforeUserPlugins => PluginOrder::Pre,
            Enforce::AfterUserPlugins => PluginOrder::Post,
        };
        Some(PluginHookMeta { order: Some(order) })
    }

    fn generate_bundle(
        &self,
        _ctx: &PluginContext,
        args: &mut HookGenerateBundleArgs<'_>,
    ) -> impl std::future::Future<Output = rolldown_plugin::HookNoopReturn> + Send {
        let result = self.extract_entry(args.bundle);

        async move { result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterDescriptor;

    fn plugin() -> RolldownSsrPlugin {
        RolldownSsrPlugin::new(
            SsrEntryPlugin::new(AdapterDescriptor::new("test", "test-adapter/server.js")),
            Arc::new(Mutex::new(BuildInternals::new())),
        )
    }

    #[test]
    fn plugin_name() {
        assert_eq!(plugin().name(), "zenith:ssr");
    }

    #[test]
    fn plugin_register_hooks() {
        let usage = plugin().register_hook_usage();
        assert!(usage.contains(HookUsage::ResolveId));
        assert!(usage.contains(HookUsage::Load));
        assert!(usage.contains(HookUsage::GenerateBundle));
    }

    #[test]
    fn generate_bundle_runs_post() {
        let meta = plugin().generate_bundle_meta().unwrap();
        assert!(matches!(meta.order, Some(PluginOrder::Post)));
    }

    #[test]
    fn ssr_input_is_appended() {
        let input = with_ssr_input(vec![InputItem {
            name: Some("index".into()),
            import: "src/main.ts".into(),
        }]);
        assert_eq!(input.len(), 2);
        assert_eq!(input[1].import, "zenith:ssr-entry");
    }
}
