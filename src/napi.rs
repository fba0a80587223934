//! Node bindings for the text stages, so a JS host build can synthesize the
//! entry and inject the manifest without a Rust-side bundler.

use napi_derive::napi;

use crate::config::AdapterDescriptor;
use crate::entry::generate_ssr_entry;
use crate::manifest::SerializedSsrManifest;
use crate::SsrError;

fn to_napi_error(err: SsrError) -> napi::Error {
    napi::Error::new(napi::Status::GenericFailure, format!("[zenith-ssr] {err}"))
}

/// Source of the virtual SSR entry for the given adapter (JSON).
#[napi]
pub fn synthesize_ssr_entry(adapter_json: String, middleware: bool) -> napi::Result<String> {
    let adapter: AdapterDescriptor = serde_json::from_str(&adapter_json)
        .map_err(|e| to_napi_error(SsrError::ConfigError(format!("invalid adapter: {e}"))))?;
    Ok(generate_ssr_entry(&adapter, middleware))
}

/// Replace every quoted manifest placeholder in `code`.
#[napi]
pub fn replace_manifest_token(code: String, manifest_json: String) -> napi::Result<String> {
    let manifest: SerializedSsrManifest =
        serde_json::from_str(&manifest_json).map_err(|e| to_napi_error(e.into()))?;
    crate::inject::replace_manifest_token(&code, &manifest).map_err(to_napi_error)
}
