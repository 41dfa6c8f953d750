pub mod element;
pub mod emit;
pub mod parser;

use crate::element::Element;

/// A compiled prompt template.
#[derive(Debug, Clone)]
pub struct Template {
    /// Document title, taken from the first header ("Document" if none).
    pub title: String,
    /// Locale tag from `#lang:xx#` (default "en").
    pub lang: String,
    /// Ordered structural elements, in source line order.
    pub elements: Vec<Element>,
    /// The source file ID (for diagnostics with codespan-reporting).
    pub source_id: usize,
}
