use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use sd_meta::ai::AiFields;
use sd_meta::config;
use sd_meta::metadata::ParsedMetadata;
use sd_meta::pipeline::{self, ImageReport};
use sd_meta::tags::RawTags;

#[derive(Parser, Debug)]
#[command(
    name = "sd-meta",
    version,
    about = "Read AI generation metadata (prompts, samplers, seeds, models) from PNG, JPEG, WebP and TIFF images"
)]
struct Cli {
    /// Image files or directories to read
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Also show every raw tag read from the file
    #[arg(long)]
    raw: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    // Load config, CLI flags override it
    let mut config = config::Config::load(cli.config.as_deref())?;
    if cli.json {
        config.output.json = true;
    }
    if cli.raw {
        config.output.show_raw = true;
    }

    let images = pipeline::collect_images(&cli.paths, &config.scan);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    log::info!("Found {} image(s) to read", images.len());

    let total = images.len();
    let mut with_ai = 0;
    let mut failed = 0;
    let mut json_results = Vec::new();

    for (i, image_path) in images.iter().enumerate() {
        log::debug!("[{}/{}] Reading: {}", i + 1, total, image_path.display());

        let report = match pipeline::read_image(image_path) {
            Ok(report) => report,
            Err(e) => {
                log::error!("{e:#}");
                failed += 1;
                if config.output.json {
                    json_results.push(serde_json::json!({
                        "path": image_path.display().to_string(),
                        "error": format!("{e:#}"),
                    }));
                }
                continue;
            }
        };

        if report.metadata.has_ai() {
            with_ai += 1;
        }

        if config.output.json {
            json_results.push(report_json(&report, config.output.show_raw));
        } else {
            print_report(&report, config.output.show_raw);
        }
    }

    // JSON output
    if config.output.json {
        let out = if config.output.pretty {
            serde_json::to_string_pretty(&json_results)?
        } else {
            serde_json::to_string(&json_results)?
        };
        println!("{out}");
    }

    // Summary
    let without_ai = total - with_ai - failed;
    log::info!("Done: {with_ai} with AI metadata, {without_ai} without, {failed} failed out of {total} images");

    Ok(())
}

fn report_json(report: &ImageReport, show_raw: bool) -> serde_json::Value {
    let mut value = serde_json::json!({
        "path": report.path.display().to_string(),
        "format": report.kind.mime_type(),
        "metadata": report.metadata,
    });
    if show_raw {
        value["raw"] = report.tags.to_json();
    }
    value
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print one image's metadata, organized by section.
fn print_report(report: &ImageReport, show_raw: bool) {
    println!();
    println!("{BOLD}File:{RESET} {} {DIM}({}){RESET}", report.path.display(), report.kind.mime_type());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    let printed_standard = print_standard(&report.metadata);

    match &report.metadata.ai {
        Some(ai) => print_ai(ai),
        None => {
            println!("  {DIM}(no AI generation metadata found){RESET}");
            println!();
        }
    }

    if show_raw {
        print_raw(&report.tags);
    } else if !printed_standard && report.metadata.ai.is_none() {
        println!("  {DIM}(no metadata found){RESET}");
        println!();
    }
}

/// Returns whether anything was printed.
fn print_standard(metadata: &ParsedMetadata) -> bool {
    let size = match (metadata.width, metadata.height) {
        (Some(w), Some(h)) => Some(format!("{w} x {h}")),
        _ => None,
    };
    let fields: Vec<(&str, Option<&str>)> = vec![
        ("Camera", metadata.camera.as_deref()),
        ("Camera model", metadata.camera_model.as_deref()),
        ("Date taken", metadata.date_taken.as_deref()),
        ("Image size", size.as_deref()),
        ("Software", metadata.software.as_deref()),
        ("Artist", metadata.artist.as_deref()),
    ];
    if !fields.iter().any(|(_, v)| v.is_some()) {
        return false;
    }

    println!("  {BOLD}Image{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    for (tag, val) in &fields {
        if let Some(v) = val {
            print_row(tag, v);
        }
    }
    println!();
    true
}

fn print_ai(ai: &AiFields) {
    println!("  {BOLD}AI Generation{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    for (field, value) in ai.iter() {
        print_highlighted(field.label(), &value.to_string());
    }
    println!();
}

fn print_raw(tags: &RawTags) {
    println!("  {BOLD}Raw Tags{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    for (group, name, tag) in tags.iter() {
        print_row(&format!("{group}.{name}"), &tag.description);
    }
    println!();
}

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Indent for continuation lines (tag column width + " : " = 25 chars + 2 leading spaces).
const INDENT: &str = "                           ";

/// Print a single row in the display table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Print a row with the value in green.
fn print_highlighted(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {GREEN}{line}{RESET}");
        } else {
            println!("  {INDENT}{GREEN}{line}{RESET}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width. Line breaks in the
/// input are kept.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in s.lines() {
        let mut current_line = String::new();
        for word in paragraph.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_line.chars().count() + 1 + word.chars().count() <= max_width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(current_line);
                current_line = word.to_string();
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
