/// A structural element of a compiled template.
/// Element order is stable and equals source line order.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A header line: `#` to `######` followed by text.
    Heading { level: u8, text: String },
    /// A run of consecutive checkbox lines, collapsed into one group.
    CheckboxGroup { items: Vec<CheckboxItem> },
    /// A non-empty line of literal text interleaved with inline markers.
    Paragraph { inlines: Vec<Inline> },
    /// `[[[label:default]]]`, promoted to its own block-level entry.
    Multiline { label: String, default: String },
    /// `(())` — content is resolved from the selected file at assembly time.
    FileSlot,
    /// A `{{{ ... }}}` span containing newlines. Content is reproduced
    /// exactly and is never re-interpreted by later passes.
    Verbatim { content: String },
}

/// Inline content within a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    /// `[[label:default]]` inline text entry.
    Entry { label: String, default: String },
    /// `<<n>>` numeric entry. Its value never reaches the assembled prompt.
    Number { value: u64 },
    /// `(* text *)` comment span.
    Comment(String),
    /// Single-line `{{{ ... }}}` verbatim span.
    Code(String),
}

/// One checkbox within a group.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckboxItem {
    /// Deterministic id derived from the label (whitespace and non-word
    /// characters stripped, collisions disambiguated with a suffix).
    pub id: String,
    pub label: String,
    /// Initial state from the source (`[x]`/`[X]` vs `[ ]`).
    pub checked: bool,
}
