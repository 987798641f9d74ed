//! Prompt context assembly.
//!
//! Takes the chunk windows produced by [`crate::chunk`] and packs as many as
//! fit into a single character-budgeted context string. Each chunk becomes a
//! numbered `Section N:` block with its whitespace collapsed, which keeps PDF
//! line-wrap artifacts out of the prompt.

/// Assemble chunks into a labelled context string no longer than `max_chars`
/// characters.
///
/// Chunks are taken in order. The first chunk whose labelled section would
/// push the running total past the budget stops assembly; later chunks are
/// not considered, so the result is always a prefix of the document.
pub fn assemble_context(chunks: &[String], max_chars: usize) -> String {
    let mut sections: Vec<String> = Vec::new();
    let mut total = 0usize;

    for (i, chunk) in chunks.iter().enumerate() {
        let clean = normalize_whitespace(chunk);
        let section = format!("Section {}: {}", i + 1, clean);

        // Budget counts the fully assembled string, separator included.
        let mut cost = section.chars().count();
        if !sections.is_empty() {
            cost += SEPARATOR.chars().count();
        }
        if total + cost > max_chars {
            break;
        }

        total += cost;
        sections.push(section);
    }

    sections.join(SEPARATOR)
}

const SEPARATOR: &str = "\n\n";

/// Collapse runs of whitespace (including newlines) into single spaces.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
