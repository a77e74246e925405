use clap::{Parser, Subcommand};
use lumo_ztmf::{parse_document, parse_document_strict, render, ZtmfDocument, ZtmfError};
use std::fs;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ztmf", about = "Inspect and render ZTMF documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that each file has a meta and/or body section
    Check {
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Render a document to HTML
    Render {
        file: String,
        /// Print the parsed structure as JSON instead of HTML
        #[arg(long)]
        json: bool,
        /// Emit a standalone page instead of the content area only
        #[arg(long, conflicts_with = "json")]
        page: bool,
    },
    /// List the component declarations of a document
    Components { file: String },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Command::Check { files } => check_files(&files),
        Command::Render { file, json, page } => report(render_file(&file, json, page)),
        Command::Components { file } => report(list_components(&file)),
    };
    process::exit(exit_code);
}

fn read(path: &str) -> Result<String, ZtmfError> {
    fs::read_to_string(path).map_err(|source| ZtmfError::Io {
        path: path.to_string(),
        source,
    })
}

fn check_files(files: &[String]) -> i32 {
    let mut exit_code = 0;

    for file_path in files {
        match read(file_path).and_then(|text| parse_document_strict(&text)) {
            Ok(doc) => {
                println!(
                    "✓ {} ({} segment(s), {} component(s))",
                    file_path,
                    doc.body.segments.len(),
                    doc.components().len()
                );
            }
            Err(e) => {
                eprintln!("✗ {}: {}", file_path, e);
                exit_code = 1;
            }
        }
    }

    exit_code
}

fn render_file(path: &str, json: bool, page: bool) -> Result<(), ZtmfError> {
    let doc: ZtmfDocument = parse_document(&read(path)?);
    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else if page {
        print!("{}", render::document_to_page(&doc));
    } else {
        println!("{}", doc.to_html());
    }
    Ok(())
}

fn list_components(path: &str) -> Result<(), ZtmfError> {
    let doc = parse_document(&read(path)?);
    for decl in doc.components() {
        match decl.inner {
            Some(inner) => println!("{}\t{}", decl.name, inner),
            None => println!("{}", decl.name),
        }
    }
    Ok(())
}

fn report(result: Result<(), ZtmfError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "ztmf failed");
            eprintln!("error: {}", e);
            1
        }
    }
}
