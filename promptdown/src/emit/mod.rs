pub mod assets;
pub mod features;

pub use features::FeatureSet;

use crate::Template;
use crate::element::{CheckboxItem, Element, Inline};

/// Policy knobs baked into the emitted artifact.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Include comment text in assembled prompts. Comments are styled as
    /// excluded; that is the default here too.
    pub include_comments: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            include_comments: false,
        }
    }
}

/// Render the template into a self-contained interactive HTML document.
///
/// Deterministic: identical templates produce byte-identical artifacts. The
/// Assembly Protocol script is embedded unconditionally, so even a template
/// with no dynamic elements produces a valid (empty) prompt on demand.
pub fn emit(template: &Template, options: &EmitOptions) -> String {
    let features = FeatureSet::scan(&template.elements);

    let mut body_parts: Vec<String> = Vec::new();
    for element in &template.elements {
        render_element(element, &mut body_parts);
    }
    let body = format!(
        "<div id=\"promptContent\">\n{}\n</div>",
        body_parts.join("\n")
    );

    format!(
        r##"<!DOCTYPE html>
<html lang="{lang}">
<head>
  <meta charset="UTF-8" />
  <title>{title}</title>
  {style}
</head>
<body>
{body}

<button id="generateButton">{button}</button>

<div class="result-box" id="resultPrompt" hidden></div>

{script}

</body>
</html>
"##,
        lang = escape_attr(&template.lang),
        title = escape_text(&template.title),
        style = assets::style_block(&features),
        body = body,
        button = assets::button_label(&template.lang),
        script = assets::script_block(&features, options.include_comments),
    )
}

fn render_element(element: &Element, out: &mut Vec<String>) {
    match element {
        Element::Heading { level, text } => {
            out.push(format!("<h{0}>{1}</h{0}>", level, escape_text(text)));
        }
        Element::CheckboxGroup { items } => {
            out.push("<div class=\"checkbox-container\">".to_string());
            for item in items {
                out.push(render_checkbox(item));
            }
            out.push("</div>".to_string());
        }
        Element::Paragraph { inlines } => {
            let content: String = inlines.iter().map(render_inline).collect();
            out.push(format!("<p class=\"prompt-item\">{}</p>", content));
        }
        Element::Multiline { label, default } => {
            out.push(format!(
                "<textarea class=\"prompt-item\" placeholder=\"{}\">{}</textarea>",
                escape_attr(label),
                escape_text(default)
            ));
        }
        Element::FileSlot => {
            out.push("<input type=\"file\" class=\"prompt-item\" />".to_string());
        }
        Element::Verbatim { content } => {
            out.push(format!("<pre><code>{}</code></pre>", escape_text(content)));
        }
    }
}

fn render_checkbox(item: &CheckboxItem) -> String {
    let checked = if item.checked { " checked" } else { "" };
    format!(
        "<label class=\"prompt-item\"><input type=\"checkbox\" id=\"{}\"{} /> {}</label>",
        escape_attr(&item.id),
        checked,
        escape_text(&item.label)
    )
}

fn render_inline(inline: &Inline) -> String {
    match inline {
        Inline::Text(text) => escape_text(text),
        Inline::Entry { label, default } => format!(
            "<input type=\"text\" class=\"inline-text\" placeholder=\"{}\" value=\"{}\" />",
            escape_attr(label),
            escape_attr(default)
        ),
        Inline::Number { value } => format!(
            "<input type=\"number\" class=\"inline-input\" value=\"{}\" min=\"1\" />",
            value
        ),
        Inline::Comment(text) => format!(
            "<span class=\"comment\" data-no-clipboard=\"true\">{}</span>",
            escape_text(text)
        ),
        Inline::Code(content) => format!("<code>{}</code>", escape_text(content)),
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn compile(source: &str) -> String {
        let (template, _) = Parser::new(source.to_string(), 0).parse();
        emit(&template, &EmitOptions::default())
    }

    #[test]
    fn compiling_twice_is_byte_identical() {
        let source = "# T\n[[[p:hi]]]\n[x] yes\n(())\n{{{a\nb}}}\n";
        assert_eq!(compile(source), compile(source));
    }

    #[test]
    fn locale_and_title_reach_the_artifact() {
        let html = compile("#lang:fr#\n# Mon Titre\n");
        assert!(html.contains("<html lang=\"fr\">"));
        assert!(html.contains("<title>Mon Titre</title>"));
        assert!(html.contains("Générer le prompt"));
    }

    #[test]
    fn jp_alias_uses_japanese_label() {
        let html = compile("#lang:jp#\ntext\n");
        assert!(html.contains("<html lang=\"jp\">"));
        assert!(html.contains("プロンプトを生成してクリップボードにコピー"));
    }

    #[test]
    fn style_rules_are_feature_gated() {
        let html = compile("plain paragraph\n");
        assert!(!html.contains("textarea {"));
        assert!(!html.contains(".checkbox-container {"));
        assert!(!html.contains(".comment {"));

        let html = compile("[[[p:d]]]\n[x] box\n(* c *)\n");
        assert!(html.contains("textarea {"));
        assert!(html.contains(".checkbox-container {"));
        assert!(html.contains(".comment {"));
    }

    #[test]
    fn file_reader_routine_is_feature_gated() {
        assert!(!compile("plain\n").contains("readFileAsText"));
        assert!(compile("(())\n").contains("readFileAsText"));
    }

    #[test]
    fn protocol_script_is_always_embedded() {
        let html = compile("");
        assert!(html.contains("generateButton"));
        assert!(html.contains("navigator.clipboard.writeText"));
        assert!(html.contains("resultPrompt"));
    }

    #[test]
    fn verbatim_block_renders_as_pre_code() {
        let html = compile("{{{a\nb}}}\n");
        assert!(html.contains("<pre><code>a\nb</code></pre>"));
        assert!(html.contains("#promptContent pre code"));
    }

    #[test]
    fn checkbox_rendering_carries_id_and_state() {
        let html = compile("[x] Ship it\n[ ] Hold\n");
        assert!(html.contains("<input type=\"checkbox\" id=\"Shipit\" checked />"));
        assert!(html.contains("<input type=\"checkbox\" id=\"Hold\" />"));
    }

    #[test]
    fn markup_in_text_is_escaped() {
        let html = compile("a <b> & c\n");
        assert!(html.contains("a &lt;b&gt; &amp; c"));
    }

    #[test]
    fn comment_skip_branch_follows_policy() {
        let source = "text (* note *)\n";
        let (template, _) = Parser::new(source.to_string(), 0).parse();

        let excluded = emit(&template, &EmitOptions::default());
        assert!(excluded.contains("noClipboard"));

        let included = emit(
            &template,
            &EmitOptions {
                include_comments: true,
            },
        );
        assert!(!included.contains("noClipboard"));
        // The marker attribute stays either way; only the skip branch changes.
        assert!(included.contains("data-no-clipboard"));
    }

    #[test]
    fn numeric_entry_renders_inline_number_input() {
        let html = compile("retry <<4>> times\n");
        assert!(html.contains("<input type=\"number\" class=\"inline-input\" value=\"4\" min=\"1\" />"));
    }
}
