use std::{
    collections::HashSet,
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use orgtree::core::{Document, Section};
use orgtree::storage::OrgParser;
use orgtree::{ParsedDocument, ParserConfig, TokenOrgParser, lex_with, unfill_text, unparse};

#[derive(Debug, Parser)]
#[command(
    name = "orgtree",
    about = "Lossless org outline parser and inspection tools",
    version
)]
struct Cli {
    /// Enable verbose logging for debugging.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(flatten)]
    parser: ParserFlags,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct ParserFlags {
    /// JSON parser configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Open TODO keywords (replaces the configured list).
    #[arg(long = "todo", global = true, value_delimiter = ',')]
    todo: Vec<String>,
    /// Finished TODO keywords (replaces the configured list).
    #[arg(long = "done", global = true, value_delimiter = ',')]
    done: Vec<String>,
    /// Re-flow hard-wrapped prose before parsing.
    #[arg(long, global = true)]
    unfill: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse Org files and print their document trees.
    Parse(ParseArgs),

    /// Print the nested heading outline of Org files.
    Outline(InputArgs),

    /// Print the token stream of one file.
    Tokens(TokensArgs),

    /// Verify that every file survives a parse/unparse round trip.
    Check(InputArgs),

    /// Join hard-wrapped prose lines.
    Unfill(UnfillArgs),
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Org files or directories containing Org files to parse.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Emit JSON instead of a debug representation.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct InputArgs {
    /// Org files or directories containing Org files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct TokensArgs {
    file: PathBuf,
    /// Emit JSON instead of one token per line.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct UnfillArgs {
    file: PathBuf,
    /// Overwrite the file instead of printing to stdout.
    #[arg(long)]
    in_place: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let config = build_config(&cli.parser)?;
    match cli.command {
        Commands::Parse(args) => handle_parse(args, config),
        Commands::Outline(args) => handle_outline(args, config),
        Commands::Tokens(args) => handle_tokens(args, &config),
        Commands::Check(args) => handle_check(args, config),
        Commands::Unfill(args) => handle_unfill(args),
    }
}

fn build_config(flags: &ParserFlags) -> Result<ParserConfig> {
    let mut config = match &flags.config {
        Some(path) => ParserConfig::from_json_file(path)?,
        None => ParserConfig::default(),
    };
    if !flags.todo.is_empty() {
        config.todo_keywords = flags.todo.clone();
    }
    if !flags.done.is_empty() {
        config.done_keywords = flags.done.clone();
    }
    config.unfill |= flags.unfill;
    log::debug!("parser config: {:?}", config);
    Ok(config)
}

fn parse_inputs(inputs: &[PathBuf], config: ParserConfig) -> Result<Vec<(PathBuf, ParsedDocument)>> {
    let expanded = expand_inputs(inputs)?;
    if expanded.is_empty() {
        anyhow::bail!("no Org files found in the provided inputs");
    }

    let parser = TokenOrgParser { config };
    let mut parsed = Vec::new();
    for path in expanded {
        log::debug!("parsing {:?}", path);
        let doc = parser.parse_file(&path)?;
        report_diagnostics(&path, &doc);
        parsed.push((path, doc));
    }
    Ok(parsed)
}

fn report_diagnostics(path: &Path, doc: &ParsedDocument) {
    let source = doc.source();
    for d in &doc.diagnostics {
        let line = source
            .get(..d.range.start)
            .map_or(1, |before| before.matches('\n').count() + 1);
        log::warn!("{}:{}: {}", path.display(), line, d.message);
    }
}

fn handle_parse(args: ParseArgs, config: ParserConfig) -> Result<()> {
    let ParseArgs { inputs, json } = args;
    let parsed = parse_inputs(&inputs, config)?;

    if json {
        #[derive(serde::Serialize)]
        struct JsonOutput<'a> {
            path: String,
            document: &'a Document,
        }

        let payload: Vec<JsonOutput<'_>> = parsed
            .iter()
            .map(|(path, doc)| JsonOutput {
                path: path.display().to_string(),
                document: &doc.document,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for (idx, (path, doc)) in parsed.iter().enumerate() {
            if parsed.len() > 1 {
                println!("== {} ==", path.display());
            }
            println!("{:#?}", doc.document);
            if parsed.len() > 1 && idx + 1 < parsed.len() {
                println!();
            }
        }
    }
    Ok(())
}

fn handle_outline(args: InputArgs, config: ParserConfig) -> Result<()> {
    let parsed = parse_inputs(&args.inputs, config)?;
    for (path, doc) in &parsed {
        if parsed.len() > 1 {
            println!("== {} ==", path.display());
        }
        print!("{}", render_outline(&doc.document));
    }
    Ok(())
}

/// One line per heading, indented by nesting depth.
fn render_outline(document: &Document) -> String {
    fn visit(out: &mut String, section: &Section, depth: usize) {
        let heading = &section.heading;
        let _ = write!(out, "{}{}", "  ".repeat(depth), "*".repeat(heading.level));
        if let Some(todo) = &heading.todo {
            let _ = write!(out, " {}", todo.keyword);
        }
        if let Some(priority) = &heading.priority {
            let _ = write!(out, " [#{}]", priority.value);
        }
        let _ = write!(out, " {}", heading.title.plain_text());
        if let Some(tags) = &heading.tags {
            let _ = write!(out, " :{}:", tags.tags.join(":"));
        }
        out.push('\n');
        for child in &section.children {
            visit(out, child, depth + 1);
        }
    }

    let mut out = String::new();
    let title = document.preamble.title.plain_text();
    if !title.is_empty() {
        let _ = writeln!(out, "{title}");
    }
    for section in &document.sections {
        visit(&mut out, section, 0);
    }
    out
}

fn handle_tokens(args: TokensArgs, config: &ParserConfig) -> Result<()> {
    let text =
        fs::read_to_string(&args.file).with_context(|| format!("reading {:?}", args.file))?;
    let text = if config.unfill { unfill_text(&text) } else { text };
    let lexed = lex_with(&text, config);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&lexed)?);
    } else {
        for (idx, token) in lexed.tokens.iter().enumerate() {
            println!("{idx:>6} {:?} {:?}", token.kind, token.text);
        }
    }
    Ok(())
}

fn handle_check(args: InputArgs, config: ParserConfig) -> Result<()> {
    let expanded = expand_inputs(&args.inputs)?;
    if expanded.is_empty() {
        anyhow::bail!("no Org files found in the provided inputs");
    }

    let parser = TokenOrgParser { config };
    let mut failures = 0usize;
    for path in &expanded {
        match check_file(&parser, path) {
            Ok(true) => println!("ok   {}", path.display()),
            Ok(false) => {
                failures += 1;
                println!("FAIL {} (round trip differs)", path.display());
            }
            Err(err) => {
                failures += 1;
                println!("FAIL {} ({err:#})", path.display());
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} of {} files failed the round trip", expanded.len());
    }
    Ok(())
}

/// Whether unparsing the file's tree reproduces the text that was parsed.
fn check_file(parser: &TokenOrgParser, path: &Path) -> Result<bool> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let expected = if parser.config.unfill {
        unfill_text(&text)
    } else {
        text
    };
    let doc = parser.parse_str(&expected)?;
    report_diagnostics(path, &doc);
    Ok(unparse(&doc) == expected)
}

fn handle_unfill(args: UnfillArgs) -> Result<()> {
    let UnfillArgs { file, in_place } = args;
    let text = fs::read_to_string(&file).with_context(|| format!("reading {:?}", file))?;
    let unfilled = unfill_text(&text);
    if in_place {
        fs::write(&file, unfilled.as_bytes()).with_context(|| format!("writing {:?}", file))?;
    } else {
        print!("{unfilled}");
        if !unfilled.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

/// Resolves CLI inputs to canonical `.org` paths. Directories are walked
/// depth first without following symlinks, each listing in name order. A path
/// named twice is kept once.
fn expand_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for path in paths {
        let canonical =
            fs::canonicalize(path).with_context(|| format!("resolving path {:?}", path))?;
        if canonical.is_file() && canonical.extension().is_none_or(|ext| ext != "org") {
            anyhow::bail!("{:?} is not an .org file", canonical);
        }
        let mut pending = vec![canonical];
        while let Some(next) = pending.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if next.is_dir() {
                log::debug!("scanning directory {:?}", next);
                let mut entries = Vec::new();
                for entry in fs::read_dir(&next).with_context(|| format!("listing {:?}", next))? {
                    let entry = entry?;
                    if !entry.file_type()?.is_symlink() {
                        entries.push(entry.path());
                    }
                }
                entries.sort();
                pending.extend(entries.into_iter().rev());
            } else if next.extension().is_some_and(|ext| ext == "org") {
                out.push(next);
            }
        }
    }
    Ok(out)
}
