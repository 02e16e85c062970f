// src/refine/parser.rs — Turn free-text critic replies into a Critique

use super::types::Critique;

/// The exact token a critic answers with when the draft needs no more work.
pub const APPROVAL_TOKEN: &str = "APPROVED";

/// Parse a critic's reply.
///
/// Approval is the bare token `APPROVED` (case-sensitive). Quotes, backticks,
/// markdown emphasis and a trailing period around it are tolerated; anything
/// else in the reply makes it a critique.
///
/// Suggestions are taken from bullet (`-`, `*`, `•`, `+`) and numbered
/// (`1.`, `2)`) list items, with indented continuation lines folded into the
/// item above. A reply with no list items yields one suggestion per paragraph.
pub fn parse_critique(reply: &str) -> anyhow::Result<Critique> {
    if reply.trim().is_empty() {
        anyhow::bail!("critic reply is empty");
    }

    if is_approval(reply) {
        return Ok(Critique::Approved);
    }

    let items = list_items(reply);
    let suggestions = if items.is_empty() {
        paragraphs(reply)
    } else {
        items
    };

    Ok(Critique::Revise(suggestions))
}

fn is_approval(reply: &str) -> bool {
    let token = reply
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '_'))
        .trim_end_matches(['.', '!'])
        .trim();
    token == APPROVAL_TOKEN
}

/// Strip a bullet or numbered-list marker, returning the item text.
fn strip_marker(line: &str) -> Option<&str> {
    for bullet in ["- ", "* ", "• ", "+ "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return Some(rest.trim());
        }
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    let rest = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')'))?;
    rest.starts_with(' ').then(|| rest.trim())
}

fn list_items(reply: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    let mut in_item = false;

    for line in reply.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            in_item = false;
            continue;
        }

        if let Some(text) = strip_marker(trimmed) {
            if !text.is_empty() {
                items.push(text.to_string());
                in_item = true;
            }
            continue;
        }

        // Indented continuation of the previous item
        let indented = line.starts_with(' ') || line.starts_with('\t');
        if in_item && indented {
            if let Some(last) = items.last_mut() {
                last.push(' ');
                last.push_str(trimmed);
            }
        } else {
            in_item = false;
        }
    }

    items
}

fn paragraphs(reply: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for line in reply.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(trimmed);
    }
    if !current.is_empty() {
        out.push(current);
    }

    out
}

/// Render suggestions as a markdown bullet list for a reviser prompt.
pub fn render_suggestions(suggestions: &[String]) -> String {
    suggestions
        .iter()
        .map(|s| format!("- {s}"))
        .collect::<Vec<_>>()
        .join("\n")
}
