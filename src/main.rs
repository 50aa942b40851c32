//! folia - markup document ingestion

use std::process::ExitCode;

use clap::Parser;

use folia::{IngestOptions, OutlineEntry, ingest_file};

#[derive(Parser)]
#[command(name = "folia")]
#[command(version, about = "Ingest a markup document and print its outline", long_about = None)]
#[command(after_help = "EXAMPLES:
    folia document.xml           Print the document outline
    folia --json document.xml    Print the outline as JSON
    folia --flat document.xml    Keep the body flat (no section tree)")]
struct Cli {
    /// Input file (word-processor XML dialect)
    #[arg(value_name = "INPUT")]
    input: String,

    /// Print the outline as JSON
    #[arg(long)]
    json: bool,

    /// Emit paragraph+class headings instead of leveled heading tags
    #[arg(long)]
    classes: bool,

    /// Keep the document flat instead of building nested sections
    #[arg(long)]
    flat: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let options = IngestOptions {
        heading_classes: cli.classes,
        build_sections: !cli.flat,
    };
    let doc = ingest_file(&cli.input, &options).map_err(|e| e.to_string())?;
    let outline = doc.outline();

    if cli.json {
        let json = serde_json::to_string_pretty(&outline).map_err(|e| e.to_string())?;
        println!("{json}");
        return Ok(());
    }

    println!("File: {}", cli.input);
    if let Some(encoding) = doc.encoding {
        println!("Encoding: {}", encoding.name());
    }
    println!("Styles: {}", doc.styles.len());
    if !doc.attachments.is_empty() {
        println!("Attachments: {}", doc.attachments.len());
    }
    if outline.is_empty() {
        println!("(no headings)");
    } else {
        print_outline(&outline, 0);
    }
    Ok(())
}

fn print_outline(entries: &[OutlineEntry], depth: usize) {
    for entry in entries {
        println!("{}- {}", "  ".repeat(depth), entry.title);
        print_outline(&entry.children, depth + 1);
    }
}
