//! The Assembly Protocol, native rendition.
//!
//! This is the same protocol the emitted artifact runs in the browser:
//! traverse prompt-bearing elements in document order, resolve each
//! contribution, and join the included ones with single newlines. File-slot
//! reads are launched concurrently at scatter time and reassembled strictly
//! by original index at gather time, so completion order never affects
//! output order.

use promptdown::Template;
use promptdown::element::{CheckboxItem, Element, Inline};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::inputs::Inputs;
use crate::reader::{FsReader, SlotReader};

/// Policy knobs for prompt assembly.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    /// Include comment text in paragraph contributions. The artifact styles
    /// comments as excluded; that is the default here too.
    pub include_comments: bool,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        AssemblyOptions {
            include_comments: false,
        }
    }
}

/// Assemble the prompt, reading file slots from the local filesystem.
pub async fn assemble(template: &Template, inputs: &Inputs, options: &AssemblyOptions) -> String {
    assemble_with_reader(template, inputs, options, FsReader).await
}

/// One element's resolved contribution. Everything except file slots is
/// ready at scatter time; `None` means "excluded from the prompt".
enum Contribution {
    Ready(Option<String>),
    Pending(JoinHandle<Option<String>>),
}

/// Assemble the prompt with a caller-supplied [`SlotReader`].
///
/// Infallible by design: unselected slots and failed reads are omitted (and
/// logged), never fatal. Repeat runs over unchanged inputs yield identical
/// prompts; the input state is only read, never mutated.
pub async fn assemble_with_reader<R: SlotReader>(
    template: &Template,
    inputs: &Inputs,
    options: &AssemblyOptions,
    reader: R,
) -> String {
    debug!(elements = template.elements.len(), "assembling prompt");

    // Scatter: walk elements in document order, starting every file read
    // immediately so slow reads overlap.
    let mut contributions: Vec<Contribution> = Vec::new();
    let mut slot_ordinal = 0usize;

    for element in &template.elements {
        match element {
            // Headers are document chrome, never prompt content.
            Element::Heading { .. } => {}
            Element::Multiline { label, default } => {
                let value = inputs
                    .entries
                    .get(label)
                    .cloned()
                    .unwrap_or_else(|| default.clone());
                contributions.push(Contribution::Ready(Some(value)));
            }
            Element::Paragraph { inlines } => {
                contributions.push(Contribution::Ready(paragraph_text(
                    inlines, inputs, options,
                )));
            }
            Element::CheckboxGroup { items } => {
                for item in items {
                    contributions.push(Contribution::Ready(checkbox_text(item, inputs)));
                }
            }
            Element::Verbatim { content } => {
                contributions.push(Contribution::Ready(Some(content.clone())));
            }
            Element::FileSlot => {
                let ordinal = slot_ordinal;
                slot_ordinal += 1;
                match inputs.files.get(&ordinal) {
                    Some(path) => {
                        let reader = reader.clone();
                        let path = path.clone();
                        contributions.push(Contribution::Pending(tokio::spawn(async move {
                            match reader.read(path.clone()).await {
                                Ok(content) => Some(content),
                                Err(err) => {
                                    warn!(
                                        path = %path.display(),
                                        slot = ordinal,
                                        "file slot read failed: {err}"
                                    );
                                    None
                                }
                            }
                        })));
                    }
                    None => contributions.push(Contribution::Ready(None)),
                }
            }
        }
    }

    // Gather: reassemble strictly by original index, regardless of read
    // completion order.
    let mut parts: Vec<String> = Vec::new();
    for contribution in contributions {
        let resolved = match contribution {
            Contribution::Ready(value) => value,
            Contribution::Pending(handle) => handle.await.unwrap_or_else(|err| {
                warn!("file slot task failed: {err}");
                None
            }),
        };
        if let Some(part) = resolved {
            parts.push(part);
        }
    }

    parts.join("\n")
}

/// Merge a paragraph's inline content into one line: entry values substituted,
/// numeric values dropped, comments per policy, whitespace collapsed and
/// trimmed. Empty results are excluded from the prompt.
fn paragraph_text(inlines: &[Inline], inputs: &Inputs, options: &AssemblyOptions) -> Option<String> {
    let mut text = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(s) => text.push_str(s),
            Inline::Entry { label, default } => {
                let value = inputs
                    .entries
                    .get(label)
                    .map(String::as_str)
                    .unwrap_or(default);
                text.push_str(value);
            }
            // Numeric values are interactive chrome only.
            Inline::Number { .. } => {}
            Inline::Comment(comment) => {
                if options.include_comments {
                    text.push_str(comment);
                }
            }
            Inline::Code(code) => text.push_str(code),
        }
    }

    let collapsed = collapse_whitespace(&text);
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

fn checkbox_text(item: &CheckboxItem, inputs: &Inputs) -> Option<String> {
    let checked = inputs
        .checkboxes
        .get(&item.id)
        .copied()
        .unwrap_or(item.checked);
    if checked { Some(item.label.clone()) } else { None }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
