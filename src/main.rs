use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context};
use clap::Parser;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

use zenith_ssr::{
    BuildInternals, Output, PendingMutations, RouteData, SerializedSsrManifest, SsrBuildHook,
    SsrBuildPlugin, SsrConfig, StaticBuildOptions,
};

/// Weave the SSR manifest into a server build.
#[derive(Debug, Parser)]
#[command(name = "zenith-ssr", version)]
struct Cli {
    /// JSON build description; read from stdin when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Server output directory (overrides `build.server`).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Print the manifest JSON to stdout instead of writing files.
    #[arg(long)]
    print_manifest: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BuildInput {
    config: SsrConfig,
    #[serde(default)]
    routes: Vec<RouteData>,
    #[serde(default)]
    internals: BuildInternals,
    /// Server bundle, as handed to `generate_bundle`.
    #[serde(default)]
    bundle: Vec<Output>,
}

/// Keeps the serialized manifest for `--print-manifest`.
#[derive(Default)]
struct ManifestCapture {
    json: Mutex<Option<String>>,
}

impl SsrBuildHook for ManifestCapture {
    fn name(&self) -> &str {
        "zenith-ssr:print-manifest"
    }

    fn build_ssr(&self, manifest: &SerializedSsrManifest) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(manifest)?;
        *self
            .json
            .lock()
            .map_err(|_| anyhow::anyhow!("manifest capture lock poisoned"))? = Some(json);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("zenith_ssr=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("[zenith-ssr] {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let source = match &cli.input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("failed to read stdin")?;
            buf
        }
    };
    if source.trim().is_empty() {
        bail!("build description is empty");
    }

    let BuildInput {
        mut config,
        routes,
        mut internals,
        mut bundle,
    } = serde_json::from_str(&source).context("invalid build description")?;
    if let Some(out_dir) = cli.out_dir {
        config.build.server = out_dir;
    }
    config.validate()?;

    let capture = Arc::new(ManifestCapture::default());
    let mut ssr = SsrBuildPlugin::new(StaticBuildOptions::new(config, routes));
    if cli.print_manifest {
        ssr = ssr.with_hook(capture.clone());
    }

    let hook = ssr.before_build()?;
    let Some(plugin) = hook.plugin else {
        tracing::info!("build has no server output; nothing to do");
        return Ok(());
    };
    plugin.generate_bundle(&mut internals, &mut bundle);

    let mut mutations = PendingMutations::new();
    ssr.after_build(&mut internals, &mut mutations).await?;

    if cli.print_manifest {
        let json = capture
            .json
            .lock()
            .map_err(|_| anyhow::anyhow!("manifest capture lock poisoned"))?
            .take()
            .context("manifest was not built")?;
        let mut stdout = tokio::io::stdout();
        stdout.write_all(json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        return Ok(());
    }

    let written = mutations.write_all(&ssr.options().config.build).await?;
    for path in written {
        tracing::info!(path = %path.display(), "wrote server entry");
    }
    Ok(())
}
