pub mod token;
pub mod warning;
mod structural;

pub use warning::ParseWarning;

use crate::Template;

/// Parser entry point.
///
/// Parsing never fails: malformed constructs degrade to literal text or are
/// skipped, and anything worth telling the author about comes back as a
/// non-fatal [`ParseWarning`].
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the extended-markdown source into a complete Template.
    pub fn parse(&self) -> (Template, Vec<ParseWarning>) {
        let tokens = token::tokenize(&self.source);
        structural::build_template(&tokens, self.file_id)
    }
}
