use std::collections::HashMap;
use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use assembler::{AssemblyOptions, Inputs, SlotReader, assemble, assemble_with_reader};
use promptdown::Template;
use promptdown::parser::Parser;

fn compile(source: &str) -> Template {
    let (template, _) = Parser::new(source.to_string(), 0).parse();
    template
}

async fn run(source: &str) -> String {
    assemble(&compile(source), &Inputs::new(), &AssemblyOptions::default()).await
}

/// Test reader with per-path artificial latency, to invert completion order.
#[derive(Clone)]
struct DelayReader {
    responses: Arc<HashMap<PathBuf, (Duration, String)>>,
}

impl DelayReader {
    fn new(responses: Vec<(&str, Duration, &str)>) -> Self {
        DelayReader {
            responses: Arc::new(
                responses
                    .into_iter()
                    .map(|(path, delay, content)| {
                        (PathBuf::from(path), (delay, content.to_string()))
                    })
                    .collect(),
            ),
        }
    }
}

impl SlotReader for DelayReader {
    fn read(&self, path: PathBuf) -> impl Future<Output = io::Result<String>> + Send {
        let responses = Arc::clone(&self.responses);
        async move {
            match responses.get(&path) {
                Some((delay, content)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(content.clone())
                }
                None => Err(io::Error::new(io::ErrorKind::NotFound, "no such slot")),
            }
        }
    }
}

#[tokio::test]
async fn end_to_end_with_defaults() {
    let template = compile("#lang:en#\n[[[p:hi]]]\n[x] yes\n[ ] no\n");
    assert_eq!(template.lang, "en");
    assert_eq!(template.elements.len(), 2);

    let prompt = assemble(&template, &Inputs::new(), &AssemblyOptions::default()).await;
    assert_eq!(prompt, "hi\nyes");
}

#[tokio::test]
async fn unchecked_items_never_contribute() {
    assert_eq!(run("[x] A\n[ ] B\n[x] C\n").await, "A\nC");
}

#[tokio::test]
async fn numeric_and_comment_values_are_absent() {
    assert_eq!(run("count <<5>> items (* secret *)\n").await, "count items");
}

#[tokio::test]
async fn comments_can_be_included_by_policy() {
    let template = compile("count <<5>> items (* secret *)\n");
    let options = AssemblyOptions {
        include_comments: true,
    };
    let prompt = assemble(&template, &Inputs::new(), &options).await;
    assert_eq!(prompt, "count items secret");
}

#[tokio::test]
async fn verbatim_block_is_reproduced_exactly() {
    assert_eq!(run("{{{a\nb}}}\n").await, "a\nb");
    assert_eq!(run("{{{  indented\n    lines  }}}\n").await, "  indented\n    lines  ");
}

#[tokio::test]
async fn paragraph_whitespace_is_collapsed() {
    assert_eq!(run("  lots   of\tspace  \n").await, "lots of space");
}

#[tokio::test]
async fn entry_defaults_and_overrides() {
    let template = compile("Hello [[name:World]]!\n");

    let prompt = assemble(&template, &Inputs::new(), &AssemblyOptions::default()).await;
    assert_eq!(prompt, "Hello World!");

    let mut inputs = Inputs::new();
    inputs.set_entry("name", "Rust");
    let prompt = assemble(&template, &inputs, &AssemblyOptions::default()).await;
    assert_eq!(prompt, "Hello Rust!");
}

#[tokio::test]
async fn checkbox_overrides_replace_compiled_state() {
    let template = compile("[ ] opt in\n[x] opt out\n");
    let mut inputs = Inputs::new();
    inputs.set_checkbox("optin", true);
    inputs.set_checkbox("optout", false);

    let prompt = assemble(&template, &inputs, &AssemblyOptions::default()).await;
    assert_eq!(prompt, "opt in");
}

#[tokio::test]
async fn multiline_contributes_even_when_empty() {
    // An empty multiline entry still holds its place in the prompt.
    assert_eq!(run("[[[p:]]]\n[x] a\n").await, "\na");
}

#[tokio::test]
async fn unselected_file_slot_is_omitted() {
    assert_eq!(run("a\n(())\nb\n").await, "a\nb");
}

#[tokio::test]
async fn failed_file_read_is_omitted_not_fatal() {
    let template = compile("a\n(())\nb\n");
    let mut inputs = Inputs::new();
    inputs.select_file(0, "/definitely/not/a/real/path.txt");

    let prompt = assemble(&template, &inputs, &AssemblyOptions::default()).await;
    assert_eq!(prompt, "a\nb");
}

#[tokio::test]
async fn file_order_survives_inverted_completion() {
    // The second slot's read completes well before the first's; the
    // assembled output must still follow document order.
    let template = compile("(())\n(())\n");
    let mut inputs = Inputs::new();
    inputs.select_file(0, "slow.txt");
    inputs.select_file(1, "fast.txt");

    let reader = DelayReader::new(vec![
        ("slow.txt", Duration::from_millis(80), "first"),
        ("fast.txt", Duration::from_millis(5), "second"),
    ]);

    let prompt =
        assemble_with_reader(&template, &inputs, &AssemblyOptions::default(), reader).await;
    assert_eq!(prompt, "first\nsecond");
}

#[tokio::test]
async fn file_reads_overlap() {
    // Two 80ms reads resolved concurrently finish in well under 160ms.
    let template = compile("(())\n(())\n");
    let mut inputs = Inputs::new();
    inputs.select_file(0, "a.txt");
    inputs.select_file(1, "b.txt");

    let reader = DelayReader::new(vec![
        ("a.txt", Duration::from_millis(80), "a"),
        ("b.txt", Duration::from_millis(80), "b"),
    ]);

    let start = Instant::now();
    let prompt =
        assemble_with_reader(&template, &inputs, &AssemblyOptions::default(), reader).await;
    assert_eq!(prompt, "a\nb");
    assert!(
        start.elapsed() < Duration::from_millis(150),
        "reads did not overlap: {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn real_files_resolve_in_document_order() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");
    let mut f = std::fs::File::create(&first).unwrap();
    write!(f, "alpha content").unwrap();
    let mut f = std::fs::File::create(&second).unwrap();
    write!(f, "beta content").unwrap();

    let template = compile("intro\n(())\n(())\noutro\n");
    let mut inputs = Inputs::new();
    inputs.select_file(0, &first);
    inputs.select_file(1, &second);

    let prompt = assemble(&template, &inputs, &AssemblyOptions::default()).await;
    assert_eq!(prompt, "intro\nalpha content\nbeta content\noutro");
}

#[tokio::test]
async fn repeat_runs_are_idempotent() {
    let template = compile("# T\n[[a:b]] text\n[x] box\n");
    let inputs = Inputs::new();
    let options = AssemblyOptions::default();

    let first = assemble(&template, &inputs, &options).await;
    let second = assemble(&template, &inputs, &options).await;
    assert_eq!(first, second);
    assert_eq!(first, "b text\nbox");
}

#[tokio::test]
async fn empty_template_yields_empty_prompt() {
    assert_eq!(run("").await, "");
    assert_eq!(run("# Only a header\n").await, "");
}
