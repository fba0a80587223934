//! The bundler boundary.
//!
//! The bundler itself is external. This module models what the SSR
//! pipeline sees of it:
//! 1. Input registration (`add_rollup_input`)
//! 2. The output set handed to `generate_bundle` (`Output`)
//! 3. The mutate-and-commit step that rewrites one output file
//!    (`ChunkMutator`, `PendingMutations`)

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::BuildConfig;
use crate::Result;

// ---------------------------------------------------------------------------
// Output units
// ---------------------------------------------------------------------------

/// A compiled code unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputChunk {
    pub file_name: String,
    pub code: String,
    /// Ids of every module that contributed code to this chunk.
    #[serde(default)]
    pub module_ids: Vec<String>,
    #[serde(default)]
    pub is_entry: bool,
}

impl OutputChunk {
    pub fn new(file_name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            code: code.into(),
            module_ids: Vec::new(),
            is_entry: false,
        }
    }

    pub fn with_modules<I, S>(mut self, module_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.module_ids.extend(module_ids.into_iter().map(Into::into));
        self
    }

    pub fn contains_module(&self, id: &str) -> bool {
        self.module_ids.iter().any(|module| module == id)
    }
}

/// A non-code output file (CSS, images, fonts...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputAsset {
    pub file_name: String,
    #[serde(default)]
    pub source: String,
}

impl OutputAsset {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            source: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Output {
    Chunk(OutputChunk),
    Asset(OutputAsset),
}

impl Output {
    pub fn file_name(&self) -> &str {
        match self {
            Output::Chunk(chunk) => &chunk.file_name,
            Output::Asset(asset) => &asset.file_name,
        }
    }
}

// ---------------------------------------------------------------------------
// Input registration
// ---------------------------------------------------------------------------

/// The bundler's `input` option in any of its accepted shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RollupInput {
    Single(String),
    Many(Vec<String>),
    /// Entry name → module id.
    Named(IndexMap<String, String>),
}

/// Add module ids to an existing input option, keeping its shape.
///
/// Named inputs key each new id on its last path segment up to the first
/// `.` (`src/entry.client.ts` → `entry`).
pub fn add_rollup_input(input: Option<RollupInput>, new_inputs: &[&str]) -> RollupInput {
    let new_owned = || new_inputs.iter().map(|id| id.to_string());
    match input {
        None => RollupInput::Many(new_owned().collect()),
        Some(RollupInput::Single(existing)) => {
            RollupInput::Many(std::iter::once(existing).chain(new_owned()).collect())
        }
        Some(RollupInput::Many(mut existing)) => {
            existing.extend(new_owned());
            RollupInput::Many(existing)
        }
        Some(RollupInput::Named(mut existing)) => {
            for id in new_inputs {
                existing.insert(input_name(id).to_string(), id.to_string());
            }
            RollupInput::Named(existing)
        }
    }
}

fn input_name(id: &str) -> &str {
    let last = id.rsplit('/').next().unwrap_or(id);
    last.split('.').next().unwrap_or(last)
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Which build pass produced an output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTarget {
    Client,
    Server,
}

/// Commits rewritten code for an output chunk.
pub trait ChunkMutator {
    fn mutate(&mut self, chunk: &OutputChunk, target: BuildTarget, code: String) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub target: BuildTarget,
    pub code: String,
}

/// Mutations collected during `build:post`, keyed by output file name.
/// A later mutation of the same file replaces the earlier one.
#[derive(Debug, Clone, Default)]
pub struct PendingMutations {
    mutations: IndexMap<String, Mutation>,
}

impl PendingMutations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, file_name: &str) -> Option<&Mutation> {
        self.mutations.get(file_name)
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Mutation)> {
        self.mutations.iter().map(|(name, m)| (name.as_str(), m))
    }

    /// Write every mutation under its target's output directory.
    /// Returns the written paths in mutation order.
    pub async fn write_all(&self, build: &BuildConfig) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.mutations.len());
        for (file_name, mutation) in &self.mutations {
            let root = match mutation.target {
                BuildTarget::Client => &build.client,
                BuildTarget::Server => &build.server,
            };
            let path = root.join(file_name);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &mutation.code).await?;
            tracing::debug!(
                path = %path.display(),
                bytes = mutation.code.len(),
                "wrote mutated chunk"
            );
            written.push(path);
        }
        Ok(written)
    }
}

impl ChunkMutator for PendingMutations {
    fn mutate(&mut self, chunk: &OutputChunk, target: BuildTarget, code: String) -> Result<()> {
        self.mutations
            .insert(chunk.file_name.clone(), Mutation { target, code });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_input_to_nothing() {
        assert_eq!(
            add_rollup_input(None, &["zenith:ssr-entry"]),
            RollupInput::Many(vec!["zenith:ssr-entry".into()])
        );
    }

    #[test]
    fn add_input_to_string() {
        let input = Some(RollupInput::Single("src/main.ts".into()));
        assert_eq!(
            add_rollup_input(input, &["zenith:ssr-entry"]),
            RollupInput::Many(vec!["src/main.ts".into(), "zenith:ssr-entry".into()])
        );
    }

    #[test]
    fn add_input_to_array() {
        let input = Some(RollupInput::Many(vec!["a.js".into(), "b.js".into()]));
        assert_eq!(
            add_rollup_input(input, &["c.js"]),
            RollupInput::Many(vec!["a.js".into(), "b.js".into(), "c.js".into()])
        );
    }

    #[test]
    fn add_input_to_object_keys_on_file_stem() {
        let mut named = IndexMap::new();
        named.insert("main".to_string(), "src/main.ts".to_string());
        let result = add_rollup_input(
            Some(RollupInput::Named(named)),
            &["src/entry.client.ts", "zenith:ssr-entry"],
        );
        let RollupInput::Named(map) = result else {
            panic!("expected named input");
        };
        assert_eq!(map.get("main").map(String::as_str), Some("src/main.ts"));
        assert_eq!(map.get("entry").map(String::as_str), Some("src/entry.client.ts"));
        assert_eq!(
            map.get("zenith:ssr-entry").map(String::as_str),
            Some("zenith:ssr-entry")
        );
    }

    #[test]
    fn input_deserializes_from_any_shape() {
        let single: RollupInput = serde_json::from_str(r#""a.js""#).unwrap();
        assert_eq!(single, RollupInput::Single("a.js".into()));
        let many: RollupInput = serde_json::from_str(r#"["a.js"]"#).unwrap();
        assert_eq!(many, RollupInput::Many(vec!["a.js".into()]));
        let named: RollupInput = serde_json::from_str(r#"{ "a": "a.js" }"#).unwrap();
        assert!(matches!(named, RollupInput::Named(_)));
        assert!(serde_json::from_str::<RollupInput>("42").is_err());
    }

    #[test]
    fn output_is_tagged_by_type() {
        let outputs: Vec<Output> = serde_json::from_str(
            r#"[
                { "type": "asset", "fileName": "assets/logo.png" },
                { "type": "chunk", "fileName": "chunk.mjs", "code": "x", "moduleIds": ["a"] }
            ]"#,
        )
        .unwrap();
        assert_eq!(outputs[0].file_name(), "assets/logo.png");
        let Output::Chunk(chunk) = &outputs[1] else {
            panic!("expected chunk");
        };
        assert!(chunk.contains_module("a"));
        assert!(!chunk.is_entry);
    }

    #[test]
    fn later_mutation_replaces_earlier() {
        let chunk = OutputChunk::new("entry.mjs", "old");
        let mut mutations = PendingMutations::new();
        mutations.mutate(&chunk, BuildTarget::Server, "one".into()).unwrap();
        mutations.mutate(&chunk, BuildTarget::Server, "two".into()).unwrap();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations.get("entry.mjs").unwrap().code, "two");
    }

    #[tokio::test]
    async fn write_all_uses_target_directory() {
        let dir = tempfile::tempdir().unwrap();
        let build = BuildConfig {
            client: dir.path().join("client"),
            server: dir.path().join("server"),
            ..Default::default()
        };
        let mut mutations = PendingMutations::new();
        mutations
            .mutate(&OutputChunk::new("entry.mjs", ""), BuildTarget::Server, "server".into())
            .unwrap();
        mutations
            .mutate(&OutputChunk::new("assets/app.js", ""), BuildTarget::Client, "client".into())
            .unwrap();

        let written = mutations.write_all(&build).await.unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("server/entry.mjs")).unwrap(),
            "server"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("client/assets/app.js")).unwrap(),
            "client"
        );
    }
}
