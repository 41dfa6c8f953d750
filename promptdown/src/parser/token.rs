use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// An inline token produced by the extractor pass.
/// Tokens are mutually exclusive per character span.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal text between markers. May contain newlines.
    Text(String),
    /// `[[[label:default]]]`
    Multiline { label: String, default: String },
    /// `[[label:default]]`
    Entry { label: String, default: String },
    /// `<<n>>`
    Number { value: u64 },
    /// `(())`
    FileSlot,
    /// `(* text *)`
    Comment(String),
    /// `{{{ ... }}}`; `multiline` decides block vs inline rendering.
    Verbatim { content: String, multiline: bool },
    /// `#lang:xx#`
    Lang(String),
}

static VERBATIM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{\{(.*?)\}\}\}").expect("valid regex"));
static MULTILINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[\[\s*([^:]+?)\s*:\s*(.*?)\s*\]\]\]").expect("valid regex"));
static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[\s*([^:]+?)\s*:\s*(.*?)\s*\]\]").expect("valid regex"));
static FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\(\s*\)\)").expect("valid regex"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\*\s*(.*?)\s*\*\)").expect("valid regex"));
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<<\s*(\d+)\s*>>").expect("valid regex"));
static LANG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#lang:(\w+)#").expect("valid regex"));

/// Split raw source into a token stream.
///
/// A single left-to-right pass: at each step the earliest-starting match wins,
/// and ties are broken by precedence — verbatim spans first (so nothing inside
/// them is ever expanded), then triple-bracket before double-bracket entries
/// (longest match first), then file slots, comments, numeric entries, and
/// locale tags. Anything that matches no rule is literal text; tokenizing is
/// total and never fails.
pub fn tokenize(source: &str) -> Vec<(Token, Range<usize>)> {
    let mut tokens: Vec<(Token, Range<usize>)> = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        match earliest_match(source, pos) {
            Some(m) => {
                if m.start > pos {
                    tokens.push((Token::Text(source[pos..m.start].to_string()), pos..m.start));
                }
                tokens.push((m.token, m.start..m.end));
                pos = m.end;
            }
            None => {
                tokens.push((Token::Text(source[pos..].to_string()), pos..source.len()));
                break;
            }
        }
    }

    tokens
}

struct Match {
    start: usize,
    end: usize,
    token: Token,
}

fn earliest_match(source: &str, pos: usize) -> Option<Match> {
    let hay = &source[pos..];
    let mut best: Option<Match> = None;

    // Precedence order: a later candidate only wins by starting strictly
    // earlier than the current best.
    let mut consider = |candidate: Option<Match>| {
        if let Some(m) = candidate {
            let better = match &best {
                Some(current) => m.start < current.start,
                None => true,
            };
            if better {
                best = Some(m);
            }
        }
    };

    consider(find_verbatim(hay, pos));
    consider(find_multiline(hay, pos));
    consider(find_entry(hay, pos));
    consider(find_file_slot(hay, pos));
    consider(find_comment(hay, pos));
    consider(find_number(hay, pos));
    consider(find_lang(hay, pos));

    best
}

fn find_verbatim(hay: &str, offset: usize) -> Option<Match> {
    let caps = VERBATIM_RE.captures(hay)?;
    let whole = caps.get(0)?;
    let content = caps.get(1).map_or("", |m| m.as_str());
    Some(Match {
        start: offset + whole.start(),
        end: offset + whole.end(),
        token: Token::Verbatim {
            content: content.to_string(),
            multiline: content.contains('\n'),
        },
    })
}

fn find_multiline(hay: &str, offset: usize) -> Option<Match> {
    let caps = MULTILINE_RE.captures(hay)?;
    let whole = caps.get(0)?;
    Some(Match {
        start: offset + whole.start(),
        end: offset + whole.end(),
        token: Token::Multiline {
            label: strip_label(&caps[1]),
            default: caps[2].to_string(),
        },
    })
}

fn find_entry(hay: &str, offset: usize) -> Option<Match> {
    let caps = ENTRY_RE.captures(hay)?;
    let whole = caps.get(0)?;
    Some(Match {
        start: offset + whole.start(),
        end: offset + whole.end(),
        token: Token::Entry {
            label: strip_label(&caps[1]),
            default: caps[2].to_string(),
        },
    })
}

fn find_file_slot(hay: &str, offset: usize) -> Option<Match> {
    let whole = FILE_RE.find(hay)?;
    Some(Match {
        start: offset + whole.start(),
        end: offset + whole.end(),
        token: Token::FileSlot,
    })
}

fn find_comment(hay: &str, offset: usize) -> Option<Match> {
    let caps = COMMENT_RE.captures(hay)?;
    let whole = caps.get(0)?;
    Some(Match {
        start: offset + whole.start(),
        end: offset + whole.end(),
        token: Token::Comment(caps[1].to_string()),
    })
}

fn find_number(hay: &str, offset: usize) -> Option<Match> {
    let caps = NUMBER_RE.captures(hay)?;
    let whole = caps.get(0)?;
    let token = match caps[1].parse::<u64>() {
        Ok(value) => Token::Number { value },
        // A value that overflows the widget's integer type degrades to text.
        Err(_) => Token::Text(whole.as_str().to_string()),
    };
    Some(Match {
        start: offset + whole.start(),
        end: offset + whole.end(),
        token,
    })
}

fn find_lang(hay: &str, offset: usize) -> Option<Match> {
    let caps = LANG_RE.captures(hay)?;
    let whole = caps.get(0)?;
    Some(Match {
        start: offset + whole.start(),
        end: offset + whole.end(),
        token: Token::Lang(caps[1].to_string()),
    })
}

/// Labels may be quoted in the source; the quotes are presentation only.
fn strip_label(raw: &str) -> String {
    raw.trim().trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn plain_text_is_one_token() {
        assert_eq!(
            kinds("just some text"),
            vec![Token::Text("just some text".to_string())]
        );
    }

    #[test]
    fn triple_bracket_wins_over_double() {
        let tokens = kinds("[[[place:fill]]]");
        assert_eq!(
            tokens,
            vec![Token::Multiline {
                label: "place".to_string(),
                default: "fill".to_string(),
            }]
        );
    }

    #[test]
    fn double_bracket_entry() {
        let tokens = kinds("before [[name:alice]] after");
        assert_eq!(
            tokens,
            vec![
                Token::Text("before ".to_string()),
                Token::Entry {
                    label: "name".to_string(),
                    default: "alice".to_string(),
                },
                Token::Text(" after".to_string()),
            ]
        );
    }

    #[test]
    fn quoted_label_is_unquoted() {
        let tokens = kinds("[[\"name\":bob]]");
        assert_eq!(
            tokens,
            vec![Token::Entry {
                label: "name".to_string(),
                default: "bob".to_string(),
            }]
        );
    }

    #[test]
    fn verbatim_protects_inner_syntax() {
        let tokens = kinds("{{{(* not a comment *) and (())}}}");
        assert_eq!(
            tokens,
            vec![Token::Verbatim {
                content: "(* not a comment *) and (())".to_string(),
                multiline: false,
            }]
        );
    }

    #[test]
    fn verbatim_multiline_flag() {
        let tokens = kinds("{{{a\nb}}}");
        assert_eq!(
            tokens,
            vec![Token::Verbatim {
                content: "a\nb".to_string(),
                multiline: true,
            }]
        );
    }

    #[test]
    fn verbatim_protects_lang_tag() {
        let tokens = kinds("{{{#lang:fr#}}}");
        assert_eq!(
            tokens,
            vec![Token::Verbatim {
                content: "#lang:fr#".to_string(),
                multiline: false,
            }]
        );
    }

    #[test]
    fn file_slot_and_comment() {
        let tokens = kinds("(()) (* note *)");
        assert_eq!(
            tokens,
            vec![
                Token::FileSlot,
                Token::Text(" ".to_string()),
                Token::Comment("note".to_string()),
            ]
        );
    }

    #[test]
    fn numeric_entry() {
        assert_eq!(kinds("<< 7 >>"), vec![Token::Number { value: 7 }]);
    }

    #[test]
    fn overflowing_number_degrades_to_text() {
        let tokens = kinds("<<99999999999999999999999999>>");
        assert_eq!(
            tokens,
            vec![Token::Text("<<99999999999999999999999999>>".to_string())]
        );
    }

    #[test]
    fn unmatched_syntax_stays_literal() {
        assert_eq!(
            kinds("[[no colon]] and (( )"),
            vec![Token::Text("[[no colon]] and (( )".to_string())]
        );
    }

    #[test]
    fn lang_tag_token() {
        let tokens = kinds("a #lang:ja# b");
        assert_eq!(
            tokens,
            vec![
                Token::Text("a ".to_string()),
                Token::Lang("ja".to_string()),
                Token::Text(" b".to_string()),
            ]
        );
    }

    #[test]
    fn entry_padding_may_cross_newline() {
        // Only the whitespace padding around label and default may span
        // lines; the captured values themselves never contain the newline.
        let tokens = kinds("[[a:\nb]]");
        assert_eq!(
            tokens,
            vec![Token::Entry {
                label: "a".to_string(),
                default: "b".to_string(),
            }]
        );
    }

    #[test]
    fn spans_cover_the_source() {
        let source = "x [[a:b]] y {{{v}}}";
        let tokens = tokenize(source);
        let mut pos = 0;
        for (_, span) in &tokens {
            assert_eq!(span.start, pos, "gap before span in {:?}", tokens);
            pos = span.end;
        }
        assert_eq!(pos, source.len());
    }
}
