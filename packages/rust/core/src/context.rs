//! Prompt context assembly.
//!
//! Renders ranked records as plain-text blocks for injection into the LLM
//! system prompt. Every field is capped at `max_field_chars` and the whole
//! block at `max_context_chars`; records are added whole, in rank order,
//! until the budget runs out.

use aitutor_shared::{ContentRecord, ContextConfig};
use tracing::debug;

/// Appended to a field cut at the per-field cap.
const FIELD_TRUNCATION_MARKER: &str = " [...]";

/// Appended once when records were dropped or cut at the block cap.
pub const CONTEXT_TRUNCATION_MARKER: &str = "[... context truncated ...]";

/// Truncate to at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => format!("{}{FIELD_TRUNCATION_MARKER}", &text[..byte_idx]),
    }
}

/// Render one record as a text block.
fn render_record(record: &ContentRecord, max_field_chars: usize) -> String {
    let mut block = format!("[{}] {}", record.source(), record.id);
    for (name, value) in record.fields() {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            continue;
        };
        block.push('\n');
        block.push_str(name);
        block.push_str(": ");
        block.push_str(&truncate_chars(value, max_field_chars));
    }
    block
}

/// Join records into one bounded context block.
///
/// The result never exceeds `max_context_chars`, truncation marker
/// included. Returns an empty string for an empty record list.
pub fn assemble_context(records: &[ContentRecord], config: &ContextConfig) -> String {
    let blocks: Vec<String> = records
        .iter()
        .map(|record| render_record(record, config.max_field_chars))
        .collect();

    let joined = blocks.join("\n\n");
    if joined.chars().count() <= config.max_context_chars {
        return joined;
    }

    // Room left once "\n" + marker is reserved.
    let marker_chars = CONTEXT_TRUNCATION_MARKER.chars().count();
    let budget = config.max_context_chars.saturating_sub(marker_chars + 1);

    let mut out = String::new();
    let mut used = 0usize;
    for block in &blocks {
        let separator = if out.is_empty() { 0 } else { 2 };
        let block_chars = block.chars().count();
        if used + separator + block_chars > budget {
            break;
        }
        if separator > 0 {
            out.push_str("\n\n");
        }
        out.push_str(block);
        used += separator + block_chars;
    }

    // The first record is cut rather than dropped so the prompt is never empty.
    if out.is_empty() {
        if let Some(first) = blocks.first() {
            out = first.chars().take(budget).collect();
        }
    }

    debug!(
        records = records.len(),
        max_context_chars = config.max_context_chars,
        kept_chars = out.chars().count(),
        "context block truncated"
    );

    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(CONTEXT_TRUNCATION_MARKER);
    out.chars().take(config.max_context_chars).collect()
}
