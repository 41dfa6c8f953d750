use std::collections::HashMap;
use std::path::PathBuf;

/// Live input state for a headless assembly run.
///
/// Mirrors what a reader would have typed and ticked in the artifact.
/// Anything not overridden here falls back to the template's compiled
/// defaults. The protocol only reads this state, never mutates it.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    /// Entry values keyed by label (covers inline and multiline entries).
    pub entries: HashMap<String, String>,
    /// Checkbox state keyed by derived id.
    pub checkboxes: HashMap<String, bool>,
    /// Selected files keyed by file-slot ordinal (document order, 0-based).
    pub files: HashMap<usize, PathBuf>,
}

impl Inputs {
    pub fn new() -> Self {
        Inputs::default()
    }

    pub fn set_entry(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(label.into(), value.into());
    }

    pub fn set_checkbox(&mut self, id: impl Into<String>, checked: bool) {
        self.checkboxes.insert(id.into(), checked);
    }

    pub fn select_file(&mut self, slot: usize, path: impl Into<PathBuf>) {
        self.files.insert(slot, path.into());
    }
}
