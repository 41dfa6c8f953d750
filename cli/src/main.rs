mod test_runner;

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use assembler::{AssemblyOptions, Inputs};
use promptdown::Template;
use promptdown::emit::EmitOptions;
use promptdown::parser::ParseWarning;

const SUBCOMMANDS: &[&str] = &["build", "preview", "test", "help"];

#[derive(Parser)]
#[command(name = "promptdown", version, about = "Prompt template compiler")]
struct Cli {
    /// Disable colored diagnostic output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a template into a self-contained HTML document
    Build(BuildArgs),

    /// Compile and print the assembled prompt using compiled defaults
    Preview(PreviewArgs),

    /// Run .test.md test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Template source file to compile
    input: String,

    /// Output path (defaults to the input name with an .html extension)
    #[arg(short, long)]
    output: Option<String>,

    /// Overwrite an existing output file without asking
    #[arg(short, long)]
    force: bool,

    /// Compile only, don't write (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the compiled template structure
    #[arg(long)]
    ast: bool,

    /// Include comment text in assembled prompts
    #[arg(long)]
    include_comments: bool,
}

#[derive(clap::Args)]
struct PreviewArgs {
    /// Template source file to compile and assemble
    input: String,

    /// Include comment text in the assembled prompt
    #[arg(long)]
    include_comments: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: String,

    /// Run only tests whose path contains this substring. Repeatable.
    #[arg(short, long)]
    filter: Vec<String>,
}

fn main() {
    init_tracing();

    // Backwards compatibility: if the first positional arg is not a known
    // subcommand, inject "build" so `promptdown file.md` works like
    // `promptdown build file.md`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(first_pos) = args.iter().skip(1).find(|a| !a.starts_with('-')) {
        let first_pos = first_pos.clone();
        if !SUBCOMMANDS.contains(&first_pos.as_str()) {
            let pos = args.iter().position(|a| *a == first_pos).unwrap();
            args.insert(pos, "build".to_string());
        }
    }

    let cli = Cli::parse_from(&args);

    match cli.command {
        Command::Build(build_args) => do_build(build_args, cli.no_color),
        Command::Preview(preview_args) => do_preview(preview_args, cli.no_color),
        Command::Test(test_args) => {
            let exit_code =
                test_runner::run_tests(Path::new(&test_args.path), cli.no_color, &test_args.filter);
            process::exit(exit_code);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PROMPTDOWN_LOG")
        .unwrap_or_else(|_| EnvFilter::new("promptdown=warn,assembler=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read and compile a template, rendering any warnings to stderr.
fn compile(input: &str, color_choice: ColorChoice) -> Template {
    let source = match std::fs::read_to_string(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", input, e);
            process::exit(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(input.to_string(), source.clone());

    let parser = promptdown::parser::Parser::new(source, file_id);
    let (template, warnings) = parser.parse();
    emit_warnings(&files, &warnings, color_choice);

    template
}

fn emit_warnings(
    files: &SimpleFiles<String, String>,
    warnings: &[ParseWarning],
    color_choice: ColorChoice,
) {
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    for warning in warnings {
        let diagnostic = warning.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, &diagnostic);
    }
}

fn do_build(args: BuildArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let template = compile(&args.input, color_choice);

    if args.check {
        eprintln!("ok: {} compiled successfully", args.input);
        return;
    }

    if args.ast {
        println!("{:#?}", template);
        return;
    }

    let options = EmitOptions {
        include_comments: args.include_comments,
    };
    let html = promptdown::emit::emit(&template, &options);

    let output = match &args.output {
        Some(path) => PathBuf::from(path),
        None => Path::new(&args.input).with_extension("html"),
    };

    if output.exists() && !args.force && !confirm_overwrite(&output) {
        eprintln!("skipped: {} left unchanged", output.display());
        return;
    }

    if let Err(e) = std::fs::write(&output, html) {
        eprintln!("error: cannot write '{}': {}", output.display(), e);
        process::exit(1);
    }
    eprintln!("wrote {}", output.display());
}

/// Ask before clobbering an existing artifact. Only `y`/`yes`
/// (case-insensitive) proceeds.
fn confirm_overwrite(path: &Path) -> bool {
    eprint!("overwrite '{}'? [y/N] ", path.display());
    let _ = std::io::stderr().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn do_preview(args: PreviewArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let template = compile(&args.input, color_choice);

    let options = AssemblyOptions {
        include_comments: args.include_comments,
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: cannot start async runtime: {}", e);
            process::exit(1);
        }
    };

    let prompt = runtime.block_on(assembler::assemble(&template, &Inputs::new(), &options));
    println!("{}", prompt);
}
