// src/cli/pipelines.rs — `agentlab pipelines`: list the catalog

use crate::pipeline::catalog::{self, Entry, Source};
use crate::util::ellipsize;

const DESCRIPTION_WIDTH: usize = 72;

pub fn list_pipelines() -> anyhow::Result<()> {
    let entries = catalog::list()?;
    for line in format_entries(&entries) {
        println!("{line}");
    }
    Ok(())
}

fn format_entries(entries: &[Entry]) -> Vec<String> {
    let width = entries
        .iter()
        .map(|e| e.pipeline.name.len())
        .max()
        .unwrap_or(0);

    entries
        .iter()
        .map(|e| {
            let description = e.pipeline.description.as_deref().unwrap_or("");
            let desc = ellipsize(description, DESCRIPTION_WIDTH);
            let tag = match e.source {
                Source::Builtin => "",
                Source::User => " (user)",
            };
            format!("{:<width$}  {}{}", e.pipeline.name, desc, tag, width = width)
        })
        .collect()
}
