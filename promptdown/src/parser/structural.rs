use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::Template;
use crate::element::{CheckboxItem, Element, Inline};
use crate::parser::token::Token;
use crate::parser::warning::ParseWarning;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s*(.+)$").expect("valid regex"));
static CHECKBOX_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[xX ]\]").expect("valid regex"));
static CHECKBOX_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([xX ])\]\s*(.+)$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the ordered element sequence from a token stream.
///
/// A single forward pass, line-oriented: header and checkbox recognition
/// applies to lines of plain text; lines carrying inline tokens become
/// paragraphs (with multiline entries and file slots promoted to their own
/// elements). Never fails — malformed lines are skipped with a warning.
pub fn build_template(
    tokens: &[(Token, Range<usize>)],
    file_id: usize,
) -> (Template, Vec<ParseWarning>) {
    let mut state = Structurer::new(file_id);
    state.process(tokens);
    state.finalize()
}

// ---------------------------------------------------------------------------
// Structurer state
// ---------------------------------------------------------------------------

/// One inline piece of the line currently being gathered.
enum Piece<'a> {
    Text(&'a str, Range<usize>),
    Token(&'a Token, Range<usize>),
}

impl Piece<'_> {
    fn span(&self) -> &Range<usize> {
        match self {
            Piece::Text(_, span) => span,
            Piece::Token(_, span) => span,
        }
    }
}

struct Structurer<'a> {
    file_id: usize,
    elements: Vec<Element>,
    title: Option<String>,
    lang: Option<String>,
    warnings: Vec<ParseWarning>,
    /// Pieces of the current (unfinished) line.
    line: Vec<Piece<'a>>,
    /// Checkbox items gathered so far in the current run.
    checkbox_run: Vec<CheckboxItem>,
    /// Occurrence count per derived checkbox id, for collision suffixes.
    ids: HashMap<String, usize>,
    checkbox_count: usize,
}

impl<'a> Structurer<'a> {
    fn new(file_id: usize) -> Self {
        Structurer {
            file_id,
            elements: Vec::new(),
            title: None,
            lang: None,
            warnings: Vec::new(),
            line: Vec::new(),
            checkbox_run: Vec::new(),
            ids: HashMap::new(),
            checkbox_count: 0,
        }
    }

    fn process(&mut self, tokens: &'a [(Token, Range<usize>)]) {
        for (token, span) in tokens {
            match token {
                Token::Lang(code) => self.set_lang(code, span),
                Token::Verbatim {
                    content,
                    multiline: true,
                } => {
                    self.finish_line();
                    self.flush_checkbox_run();
                    self.elements.push(Element::Verbatim {
                        content: content.clone(),
                    });
                }
                Token::Text(text) => self.push_text(text, span),
                other => self.line.push(Piece::Token(other, span.clone())),
            }
        }
        self.finish_line();
        self.flush_checkbox_run();
    }

    fn finalize(self) -> (Template, Vec<ParseWarning>) {
        let template = Template {
            title: self.title.unwrap_or_else(|| "Document".to_string()),
            lang: self.lang.unwrap_or_else(|| "en".to_string()),
            elements: self.elements,
            source_id: self.file_id,
        };
        (template, self.warnings)
    }

    fn set_lang(&mut self, code: &str, span: &Range<usize>) {
        if self.lang.is_none() {
            self.lang = Some(code.to_string());
        } else {
            self.warnings.push(ParseWarning::new(
                "extra language tag ignored; the first one wins",
                span.clone(),
                self.file_id,
            ));
        }
    }

    /// Append a text token to the current line, finishing a line at each
    /// newline it contains.
    fn push_text(&mut self, text: &'a str, span: &Range<usize>) {
        let mut offset = 0;
        let mut first = true;
        for segment in text.split('\n') {
            if !first {
                self.finish_line();
            }
            first = false;
            if !segment.is_empty() {
                let start = span.start + offset;
                self.line
                    .push(Piece::Text(segment, start..start + segment.len()));
            }
            offset += segment.len() + 1;
        }
    }

    fn finish_line(&mut self) {
        let line = std::mem::take(&mut self.line);
        if line.is_empty() {
            // Blank lines produce nothing, but they do end a checkbox run.
            self.flush_checkbox_run();
            return;
        }

        let all_text = line.iter().all(|p| matches!(p, Piece::Text(..)));
        if all_text {
            let text: String = line
                .iter()
                .map(|p| match p {
                    Piece::Text(s, _) => *s,
                    Piece::Token(..) => "",
                })
                .collect();
            let trimmed = text.trim();
            let span = line_span(&line);

            if trimmed.is_empty() {
                self.flush_checkbox_run();
            } else if trimmed.starts_with('#') {
                self.flush_checkbox_run();
                self.header_line(trimmed, span);
            } else if CHECKBOX_LINE_RE.is_match(trimmed) {
                self.checkbox_line(trimmed, span);
            } else {
                self.flush_checkbox_run();
                self.elements.push(Element::Paragraph {
                    inlines: vec![Inline::Text(trimmed.to_string())],
                });
            }
            return;
        }

        self.flush_checkbox_run();
        self.mixed_line(line);
    }

    fn header_line(&mut self, line: &str, span: Range<usize>) {
        match HEADER_RE.captures(line) {
            Some(caps) => {
                let level = caps[1].len() as u8;
                let text = caps[2].trim().to_string();
                if self.title.is_none() {
                    self.title = Some(text.clone());
                }
                self.elements.push(Element::Heading { level, text });
            }
            None => {
                self.warnings.push(ParseWarning::new(
                    "header line has no text and was skipped",
                    span,
                    self.file_id,
                ));
            }
        }
    }

    fn checkbox_line(&mut self, line: &str, span: Range<usize>) {
        match CHECKBOX_ITEM_RE.captures(line) {
            Some(caps) => {
                let checked = caps[1].eq_ignore_ascii_case("x");
                let label = caps[2].trim().to_string();
                let id = self.checkbox_id(&label, &span);
                self.checkbox_run.push(CheckboxItem { id, label, checked });
            }
            None => {
                // The run continues; only the malformed line is dropped.
                self.warnings.push(ParseWarning::new(
                    "checkbox line has no label and was skipped",
                    span,
                    self.file_id,
                ));
            }
        }
    }

    /// Derive a checkbox id from its label: strip whitespace, strip non-word
    /// characters, fall back to a positional name for empty results, and
    /// suffix duplicates.
    fn checkbox_id(&mut self, label: &str, span: &Range<usize>) -> String {
        self.checkbox_count += 1;
        let slug: String = label
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        let base = if slug.is_empty() {
            format!("item{}", self.checkbox_count)
        } else {
            slug
        };

        let seen = self.ids.entry(base.clone()).or_insert(0);
        *seen += 1;
        if *seen == 1 {
            base
        } else {
            let id = format!("{}_{}", base, *seen);
            self.warnings.push(
                ParseWarning::new(
                    format!("checkbox label produces duplicate id '{}'", base),
                    span.clone(),
                    self.file_id,
                )
                .with_note(format!("renamed to '{}'", id)),
            );
            id
        }
    }

    fn flush_checkbox_run(&mut self) {
        if !self.checkbox_run.is_empty() {
            self.elements.push(Element::CheckboxGroup {
                items: std::mem::take(&mut self.checkbox_run),
            });
        }
    }

    /// A line carrying inline tokens: build paragraph content, promoting
    /// multiline entries and file slots to their own elements.
    fn mixed_line(&mut self, line: Vec<Piece<'a>>) {
        let mut inlines: Vec<Inline> = Vec::new();

        for piece in line {
            match piece {
                Piece::Text(text, _) => inlines.push(Inline::Text(text.to_string())),
                Piece::Token(token, _) => match token {
                    Token::Multiline { label, default } => {
                        flush_paragraph(&mut inlines, &mut self.elements);
                        self.elements.push(Element::Multiline {
                            label: label.clone(),
                            default: default.clone(),
                        });
                    }
                    Token::FileSlot => {
                        flush_paragraph(&mut inlines, &mut self.elements);
                        self.elements.push(Element::FileSlot);
                    }
                    Token::Entry { label, default } => inlines.push(Inline::Entry {
                        label: label.clone(),
                        default: default.clone(),
                    }),
                    Token::Number { value } => inlines.push(Inline::Number { value: *value }),
                    Token::Comment(text) => inlines.push(Inline::Comment(text.clone())),
                    Token::Verbatim { content, .. } => {
                        inlines.push(Inline::Code(content.clone()))
                    }
                    // Consumed before the line buffer.
                    Token::Text(_) | Token::Lang(_) => {}
                },
            }
        }

        flush_paragraph(&mut inlines, &mut self.elements);
    }
}

fn flush_paragraph(inlines: &mut Vec<Inline>, elements: &mut Vec<Element>) {
    let has_content = inlines.iter().any(|inline| match inline {
        Inline::Text(text) => !text.trim().is_empty(),
        _ => true,
    });
    if has_content {
        elements.push(Element::Paragraph {
            inlines: std::mem::take(inlines),
        });
    } else {
        inlines.clear();
    }
}

fn line_span(line: &[Piece<'_>]) -> Range<usize> {
    let start = line.first().map(|p| p.span().start).unwrap_or(0);
    let end = line.last().map(|p| p.span().end).unwrap_or(0);
    start..end
}
