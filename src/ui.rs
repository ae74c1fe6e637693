#![forbid(unsafe_code)]

use dirpack::archive::{self, Error};
use dirpack::prompt::Interactive;
use inquire::{Confirm, Select, Text};
use std::path::{Path, PathBuf};

fn prompt_err(e: inquire::InquireError) -> Error {
    Error::Prompt(e.to_string())
}

fn normalize_input(s: &str) -> String {
    archive::normalize_slashes(s.trim())
}

fn default_archive_for(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .unwrap_or("archive");
    PathBuf::from(format!("{name}.tar"))
}

pub fn run() -> archive::Result<()> {
    println!("dirpack wizard\n");

    let action = Select::new("Action", vec!["pack", "unpack"])
        .prompt()
        .map_err(prompt_err)?;

    if action == "pack" {
        let source = Text::new("Source directory")
            .with_default(".")
            .prompt()
            .map(|s| PathBuf::from(normalize_input(&s)))
            .map_err(prompt_err)?;

        let suggested = default_archive_for(&source);
        let output = Text::new("Output archive")
            .with_default(&suggested.to_string_lossy())
            .prompt()
            .map(|s| PathBuf::from(normalize_input(&s)))
            .map_err(prompt_err)?;

        println!("\nPack summary:");
        println!("  source : {}", source.display());
        println!("  archive: {}", output.display());

        if !proceed()? {
            return Ok(());
        }
        return crate::run_pack(&source, &output, false, &mut Interactive);
    }

    let input = Text::new("Archive")
        .with_default("archive.tar")
        .prompt()
        .map(|s| PathBuf::from(normalize_input(&s)))
        .map_err(prompt_err)?;

    let output = Text::new("Restore as (empty keeps the stored root)")
        .with_default("")
        .prompt()
        .map(|s| normalize_input(&s))
        .map_err(prompt_err)?;

    let safe_paths = Confirm::new("Refuse paths that escape the restored root?")
        .with_default(true)
        .prompt()
        .map_err(prompt_err)?;

    println!("\nUnpack summary:");
    println!("  archive: {}", input.display());
    println!(
        "  root   : {}",
        if output.is_empty() { "<stored>" } else { &output }
    );
    println!("  safe   : {}", safe_paths);

    if !proceed()? {
        return Ok(());
    }

    let output = (!output.is_empty()).then(|| PathBuf::from(output));
    crate::run_unpack(&input, output.as_deref(), safe_paths, false, &mut Interactive)
}

fn proceed() -> archive::Result<bool> {
    Confirm::new("Proceed?")
        .with_default(true)
        .prompt()
        .map_err(prompt_err)
}
