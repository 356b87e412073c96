//! Command-line interface for inspecting how a message will be split.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;
use serde::Serialize;

use crate::decomposer::decompose;
use crate::error::{MimeError, Result};
use crate::types::Part;

/// MailSplit MIME - Show the parts an email message decomposes into.
#[derive(Parser)]
#[command(name = "mailsplit-mime")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the body and attachments of a message file.
    Inspect {
        /// Path to an .eml / RFC 5322 message
        file: PathBuf,

        /// Print the parts as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// JSON shape of one inspected part.
#[derive(Debug, Serialize)]
struct PartSummary<'a> {
    #[serde(flatten)]
    part: &'a Part,
    size: usize,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { file, json } => inspect_command(&file, json),
    }
}

/// Execute the inspect command.
fn inspect_command(file: &Path, json: bool) -> Result<()> {
    if !file.is_file() {
        return Err(MimeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Message file does not exist: {}", file.display()),
        )));
    }

    let raw = std::fs::read(file)?;
    let decomposition = decompose(&raw)?;
    let subject = decomposition.subject().map(str::to_string);
    let parts: Vec<Part> = decomposition.collect();

    if json {
        let summaries: Vec<PartSummary<'_>> = parts
            .iter()
            .map(|part| PartSummary {
                part,
                size: part.size(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!(
        "{} {}",
        style("Message").bold(),
        style(file.display()).cyan()
    );
    if let Some(subject) = subject {
        println!("  Subject: {}", style(subject).green());
    }
    println!("  Parts: {}", parts.len());
    println!();

    for part in &parts {
        println!(
            "  {:>3}  {:<14} {:<40} {:<28} {:>10}",
            part.ordinal,
            part.role.as_str(),
            part.filename,
            part.content_type.as_deref().unwrap_or("-"),
            format!("{} B", part.size())
        );
    }

    Ok(())
}
