//! Manifest injection.
//!
//! The compiled SSR entry still contains the quoted placeholder emitted by
//! [`crate::entry::generate_ssr_entry`]. Injection swaps every quoted
//! occurrence for the manifest JSON. This is a plain text replacement: JSON
//! object syntax is a valid JS expression, so no quotes are put back.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use jwalk::WalkDir;
use path_slash::PathExt;
use regex::Regex;

use crate::build::{SsrBuildHook, StaticBuildOptions};
use crate::internals::BuildInternals;
use crate::manifest::{build_manifest, SerializedSsrManifest};
use crate::utils::MANIFEST_REPLACE;
use crate::{Result, SsrError};

fn replace_exp() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r#"['"]{}['"]"#, regex::escape(MANIFEST_REPLACE)))
            .expect("manifest placeholder pattern is a fixed literal")
    })
}

/// Replace every quoted manifest placeholder in `code` with the manifest
/// JSON. All occurrences receive byte-identical text.
pub fn replace_manifest_token(code: &str, manifest: &SerializedSsrManifest) -> Result<String> {
    let json = manifest.to_json()?;
    Ok(replace_exp()
        .replace_all(code, regex::NoExpand(&json))
        .into_owned())
}

/// Number of quoted placeholders in `code`.
pub fn count_manifest_tokens(code: &str) -> usize {
    replace_exp().find_iter(code).count()
}

/// Every file under the client build directory, relative to it with
/// forward slashes, sorted. A missing directory yields nothing.
pub fn collect_client_statics(client_dir: &Path) -> Result<Vec<String>> {
    if !client_dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(client_dir) {
        let entry = entry
            .map_err(|e| SsrError::BuildError(format!("failed to scan client output: {e}")))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(client_dir).unwrap_or(path.as_path());
        files.push(relative.to_slash_lossy().into_owned());
    }
    files.sort();
    Ok(files)
}

async fn scan_client_statics(client_dir: PathBuf) -> Result<Vec<String>> {
    tokio::task::spawn_blocking(move || collect_client_statics(&client_dir))
        .await
        .map_err(|e| SsrError::BuildError(format!("client scan task failed: {e}")))?
}

/// Build the manifest and inject it into the SSR entry chunk's code.
///
/// Adds the client build output to the static files first, then runs every
/// `build:ssr` hook with the finished manifest. Returns the new code; the
/// chunk itself is left untouched.
pub async fn inject_manifest(
    opts: &StaticBuildOptions,
    internals: &mut BuildInternals,
    hooks: &[Arc<dyn SsrBuildHook>],
) -> Result<String> {
    internals.ssr_entry_chunk()?;

    let client_statics = scan_client_statics(opts.config.build.client.clone()).await?;
    tracing::debug!(files = client_statics.len(), "collected client statics");
    for file in client_statics {
        internals.add_static_file(file);
    }

    let static_files: Vec<String> = internals.static_files.iter().cloned().collect();
    let manifest = build_manifest(opts, internals, static_files)?;

    for hook in hooks {
        hook.build_ssr(&manifest).map_err(|e| SsrError::HookFailed {
            hook: hook.name().to_string(),
            message: format!("{e:#}"),
        })?;
    }

    let code = &internals.ssr_entry_chunk()?.code;
    let tokens = count_manifest_tokens(code);
    if tokens == 0 {
        tracing::warn!("SSR entry chunk contains no manifest placeholder");
    }
    tracing::debug!(tokens, "injecting SSR manifest");
    replace_manifest_token(code, &manifest)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdapterDescriptor, OutputMode, SsrConfig};

    fn manifest() -> SerializedSsrManifest {
        let opts = StaticBuildOptions::new(
            SsrConfig {
                output: OutputMode::Server,
                adapter: Some(AdapterDescriptor::new("test", "test/server.js")),
                ..Default::default()
            },
            Vec::new(),
        );
        build_manifest(&opts, &BuildInternals::new(), Vec::new()).unwrap()
    }

    #[test]
    fn replaces_single_and_double_quoted_tokens() {
        let manifest = manifest();
        let json = manifest.to_json().unwrap();
        let code = "a('@@ZENITH_MANIFEST_REPLACE@@');\nb(\"@@ZENITH_MANIFEST_REPLACE@@\");";
        let out = replace_manifest_token(code, &manifest).unwrap();
        assert_eq!(out, format!("a({json});\nb({json});"));
        assert_eq!(count_manifest_tokens(&out), 0);
    }

    #[test]
    fn unquoted_token_is_left_alone() {
        let code = "// @@ZENITH_MANIFEST_REPLACE@@";
        let out = replace_manifest_token(code, &manifest()).unwrap();
        assert_eq!(out, code);
    }

    #[test]
    fn dollar_signs_in_json_are_literal() {
        let mut manifest = manifest();
        manifest.base = "/$1/".into();
        let out = replace_manifest_token("x('@@ZENITH_MANIFEST_REPLACE@@')", &manifest).unwrap();
        assert!(out.contains(r#""base":"/$1/""#));
    }

    #[test]
    fn collect_statics_walks_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("assets/img")).unwrap();
        std::fs::write(dir.path().join("favicon.svg"), "").unwrap();
        std::fs::write(dir.path().join("assets/app.css"), "").unwrap();
        std::fs::write(dir.path().join("assets/img/logo.png"), "").unwrap();

        let files = collect_client_statics(dir.path()).unwrap();
        assert_eq!(
            files,
            vec!["assets/app.css", "assets/img/logo.png", "favicon.svg"]
        );
    }

    #[test]
    fn collect_statics_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = collect_client_statics(&dir.path().join("missing")).unwrap();
        assert!(files.is_empty());
    }
}
