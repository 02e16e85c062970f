// src/pipeline/catalog.rs — Built-in and user pipeline lookup

use std::path::Path;

use super::Pipeline;
use crate::infra::errors::AgentLabError;
use crate::infra::paths;

/// Built-in pipeline definitions, embedded at compile time.
const BUILTIN: &[(&str, &str)] = &[
    (
        "helpful_assistant",
        include_str!("../../pipelines/helpful_assistant.toml"),
    ),
    (
        "research_and_summarize",
        include_str!("../../pipelines/research_and_summarize.toml"),
    ),
    (
        "papers_pipeline",
        include_str!("../../pipelines/papers_pipeline.toml"),
    ),
    (
        "papers_digest",
        include_str!("../../pipelines/papers_digest.toml"),
    ),
];

/// Where a listed pipeline came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Builtin,
    User,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub pipeline: Pipeline,
    pub source: Source,
}

pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(name, _)| *name)
}

/// A built-in pipeline by name.
pub fn builtin(name: &str) -> anyhow::Result<Pipeline> {
    let (_, content) = BUILTIN
        .iter()
        .find(|(n, _)| *n == name)
        .ok_or_else(|| AgentLabError::UnknownPipeline {
            name: name.to_string(),
        })?;
    Pipeline::from_toml_str(content)
}

/// Resolve a pipeline name: `<pipelines_dir>/<name>.toml` first, then the built-ins.
pub fn get(name: &str) -> anyhow::Result<Pipeline> {
    match paths::pipelines_dir() {
        Some(dir) => get_in(&dir, name),
        None => builtin(name),
    }
}

fn get_in(dir: &Path, name: &str) -> anyhow::Result<Pipeline> {
    let path = dir.join(format!("{name}.toml"));
    if path.is_file() {
        tracing::debug!("Using user pipeline {}", path.display());
        return Pipeline::load_from(&path);
    }
    builtin(name)
}

/// Every pipeline available by name. User pipelines shadow built-ins of the same name.
pub fn list() -> anyhow::Result<Vec<Entry>> {
    match paths::pipelines_dir() {
        Some(dir) => list_in(&dir),
        None => list_in(Path::new("")),
    }
}

fn list_in(dir: &Path) -> anyhow::Result<Vec<Entry>> {
    let user = load_user_pipelines(dir)?;

    let mut entries = Vec::new();
    for name in builtin_names() {
        if user.iter().any(|p| p.name == name) {
            continue;
        }
        entries.push(Entry {
            pipeline: builtin(name)?,
            source: Source::Builtin,
        });
    }
    entries.extend(user.into_iter().map(|pipeline| Entry {
        pipeline,
        source: Source::User,
    }));
    entries.sort_by(|a, b| a.pipeline.name.cmp(&b.pipeline.name));
    Ok(entries)
}

/// Parse every `*.toml` in `dir`. A missing directory yields nothing; a broken file is skipped.
fn load_user_pipelines(dir: &Path) -> anyhow::Result<Vec<Pipeline>> {
    if dir.as_os_str().is_empty() || !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut pipelines = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        match Pipeline::load_from(&path) {
            Ok(p) => pipelines.push(p),
            Err(e) => tracing::warn!("Skipping {}: {:#}", path.display(), e),
        }
    }
    Ok(pipelines)
}
