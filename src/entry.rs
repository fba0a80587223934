//! Virtual SSR entry generation.
//!
//! The generated module is only meaningful once the bundler resolves it:
//! it imports the adapter's runtime and the page registry, deserializes the
//! manifest placeholder (swapped for real JSON after bundling), installs
//! the manifest process-wide, and re-exports whatever the adapter asks for.

use std::fmt::Write;

use serde_json::Value;

use crate::config::AdapterDescriptor;
use crate::utils::{
    escape_js_string, APP_MODULE_ID, MANIFEST_REPLACE, PAGES_VIRTUAL_MODULE_ID,
    SSR_MANIFEST_MODULE_ID,
};

/// Generate the source of the virtual SSR entry module.
///
/// `middleware` adds `middleware: _main.middleware` to the manifest.
pub fn generate_ssr_entry(adapter: &AdapterDescriptor, middleware: bool) -> String {
    let adapter_module = escape_js_string(&adapter.server_entrypoint);
    let pages = escape_js_string(PAGES_VIRTUAL_MODULE_ID);

    let mut code = String::with_capacity(1024);

    // Writing to a String cannot fail.
    let _ = write!(
        code,
        r#"import * as adapter from '{adapter_module}';
import * as _main from '{pages}';
import {{ deserializeManifest as _deserializeManifest }} from '{APP_MODULE_ID}';
import {{ _privateSetManifestDontUseThis }} from '{SSR_MANIFEST_MODULE_ID}';
const _manifest = Object.assign(_deserializeManifest('{MANIFEST_REPLACE}'), {{
	pageMap: _main.pageMap,
	renderers: _main.renderers,
"#
    );
    if middleware {
        code.push_str("\tmiddleware: _main.middleware,\n");
    }
    code.push_str("});\n_privateSetManifestDontUseThis(_manifest);\n");

    let args = match &adapter.args {
        Some(args) if is_truthy(args) => args.to_string(),
        _ => "undefined".to_string(),
    };
    let _ = writeln!(code, "const _args = {args};");
    let _ = writeln!(code, "export * from '{pages}';");

    if let Some(exports) = &adapter.exports {
        code.push_str("const _exports = adapter.createExports(_manifest, _args);\n");
        for name in exports {
            if name == "default" {
                code.push_str("const _default = _exports['default'];\n");
                code.push_str("export { _default as default };\n");
            } else {
                let _ = writeln!(code, "export const {name} = _exports['{name}'];");
            }
        }
    }

    if adapter.has_start_hook() {
        code.push_str("adapter.start(_manifest, _args);\n");
    }

    code
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// JS truthiness of a JSON value. Falsy adapter args become `undefined`.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
