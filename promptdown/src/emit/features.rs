use crate::element::{Element, Inline};

/// Which element kinds a template uses. Computed once from the IR; the
/// emitter includes only the style rules and behavior routines these flags
/// call for, keeping the artifact payload small.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSet {
    pub multiline_entry: bool,
    pub inline_entry: bool,
    pub numeric_entry: bool,
    pub file_slot: bool,
    pub checkbox: bool,
    pub verbatim_block: bool,
    pub inline_code: bool,
    pub comment: bool,
    pub h1: bool,
}

impl FeatureSet {
    /// Scan the element sequence. Pure: same IR, same feature set.
    pub fn scan(elements: &[Element]) -> Self {
        let mut features = FeatureSet::default();
        for element in elements {
            match element {
                Element::Heading { level, .. } => {
                    if *level == 1 {
                        features.h1 = true;
                    }
                }
                Element::CheckboxGroup { .. } => features.checkbox = true,
                Element::Multiline { .. } => features.multiline_entry = true,
                Element::FileSlot => features.file_slot = true,
                Element::Verbatim { .. } => features.verbatim_block = true,
                Element::Paragraph { inlines } => {
                    for inline in inlines {
                        match inline {
                            Inline::Entry { .. } => features.inline_entry = true,
                            Inline::Number { .. } => features.numeric_entry = true,
                            Inline::Comment(_) => features.comment = true,
                            Inline::Code(_) => features.inline_code = true,
                            Inline::Text(_) => {}
                        }
                    }
                }
            }
        }
        features
    }
}
