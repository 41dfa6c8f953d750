//! Static payload pieces for the emitted artifact: localized button labels,
//! feature-gated style rules, and the Assembly Protocol script.

use crate::emit::features::FeatureSet;

/// Label for the generate button, by locale. `jp` is accepted as an alias
/// for Japanese; unknown locales fall back to English.
pub(crate) fn button_label(lang: &str) -> &'static str {
    let key = lang.to_lowercase();
    let key = if key == "jp" { "ja".to_string() } else { key };
    match key.as_str() {
        "ja" => "プロンプトを生成してクリップボードにコピー",
        "fr" => "Générer le prompt et copier dans le presse-papiers",
        "it" => "Genera prompt e copia negli appunti",
        "es" => "Generar prompt y copiar al portapapeles",
        _ => "Generate Prompt &amp; Copy to Clipboard",
    }
}

/// Build the `<style>` block, including only the rules the present element
/// kinds need.
pub(crate) fn style_block(features: &FeatureSet) -> String {
    let mut rules: Vec<&str> = Vec::new();

    rules.push(
        r##"body {
  max-width: 800px;
  margin: 0 auto;
  font-family: sans-serif;
}"##,
    );

    if features.h1 {
        rules.push(
            r##"h1 {
  margin-top: 1em;
  font-size: 2em;
}"##,
        );
    }

    if features.multiline_entry {
        rules.push(
            r##"textarea {
  width: 100%;
  height: 100px;
  margin-bottom: 1em;
}"##,
        );
    }

    if features.inline_entry {
        rules.push(
            r##"input.inline-text {
  padding: 2px;
  font-size: 1em;
  text-align: center;
}"##,
        );
    }

    rules.push(
        r##"button {
  padding: 0.5em 1em;
  cursor: pointer;
}"##,
    );

    rules.push(
        r##".result-box {
  white-space: pre-wrap;
  border: 1px solid #ddd;
  padding: 1em;
  margin-top: 1em;
}"##,
    );

    if features.checkbox {
        rules.push(
            r##".checkbox-container {
  margin-bottom: 1em;
}"##,
        );
        rules.push(
            r##"label {
  display: block;
  margin-bottom: 0.5em;
}"##,
        );
    }

    if features.comment {
        rules.push(
            r##".comment {
  color: grey;
}"##,
        );
    }

    if features.numeric_entry {
        rules.push(
            r##".inline-input {
  width: 3em;
  padding: 2px;
  font-size: 1em;
  text-align: center;
}"##,
        );
    }

    format!("<style>\n{}\n</style>", rules.join("\n"))
}

/// Build the `<script>` block embedding the Assembly Protocol.
///
/// The protocol resolves every prompt-bearing element's contribution at
/// scatter time — file reads start immediately as promises — and gathers the
/// results with `Promise.all`, which preserves element index order no matter
/// when each read completes. Contributions resolving to `null` are excluded.
pub(crate) fn script_block(features: &FeatureSet, include_comments: bool) -> String {
    let mut selector = String::from("#promptContent .prompt-item");
    if features.verbatim_block {
        selector.push_str(", #promptContent pre code");
    }

    let mut js = String::new();
    js.push_str("<script>\n(function () {\n");
    js.push_str(
        r##"  document.getElementById("generateButton").addEventListener("click", async () => {
"##,
    );
    js.push_str(&format!(
        "    const elements = document.querySelectorAll(\"{}\");\n",
        selector
    ));
    js.push_str(
        r##"    const parts = [];
    for (const el of elements) {
      parts.push(resolveElement(el));
    }
    const resolved = await Promise.all(parts);
    const prompt = resolved.filter((part) => part !== null).join("\n");
    navigator.clipboard.writeText(prompt)
      .then(() => { alert("Copied to clipboard!"); })
      .catch((err) => { alert("Failed to copy: " + err); });
    const resultPrompt = document.getElementById("resultPrompt");
    resultPrompt.hidden = false;
    resultPrompt.textContent = prompt;
  });

  function resolveElement(el) {
    const tag = el.tagName.toLowerCase();
    if (tag === "textarea") {
      return el.value;
    }
    if (tag === "p") {
      const text = getElementText(el);
      return text === "" ? null : text;
    }
    if (tag === "label") {
      const checkbox = el.querySelector("input[type='checkbox']");
      return checkbox && checkbox.checked ? getElementText(el) : null;
    }
    if (tag === "code") {
      return el.textContent;
    }
"##,
    );

    if features.file_slot {
        js.push_str(
            r##"    if (tag === "input" && el.type === "file") {
      if (!el.files || el.files.length === 0) {
        return null;
      }
      return readFileAsText(el.files[0]).catch((err) => {
        console.error("Error reading file:", err);
        return null;
      });
    }
"##,
        );
    }

    js.push_str("    return null;\n  }\n");

    if features.file_slot {
        js.push_str(
            r##"
  function readFileAsText(file) {
    return new Promise((resolve, reject) => {
      const reader = new FileReader();
      reader.onload = () => resolve(reader.result);
      reader.onerror = reject;
      reader.readAsText(file);
    });
  }
"##,
        );
    }

    js.push_str(
        r##"
  function getElementText(el) {
    let text = "";
    el.childNodes.forEach((node) => {
      if (node.nodeType === Node.ELEMENT_NODE) {
        const tag = node.tagName.toLowerCase();
        if (tag === "input") {
          if (node.type === "text") {
            text += node.value;
          }
"##,
    );

    if features.comment && !include_comments {
        js.push_str(
            r##"        } else if (node.dataset && node.dataset.noClipboard) {
          // marked as excluded from the prompt
"##,
        );
    }

    js.push_str(
        r##"        } else {
          text += node.textContent;
        }
      } else {
        text += node.textContent;
      }
    });
    return text.replace(/\s+/g, " ").trim();
  }
})();
</script>"##,
    );

    js
}
