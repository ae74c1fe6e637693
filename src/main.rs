#![forbid(unsafe_code)]

mod ui;

use clap::{Parser, Subcommand};
use dirpack::archive::{self, Progress};
use dirpack::prompt::{Assume, Interactive, OverwritePrompt};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dirpack", version, about = "Pack a directory tree into a single archive file")]
struct Cli {
    /// Answer "yes" to every overwrite prompt.
    #[arg(short, long, global = true, default_value_t = false)]
    yes: bool,

    /// Don't print a line per packed/unpacked entry.
    #[arg(short, long, global = true, default_value_t = false)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive wizard (terminal).
    Ui,

    /// Pack a directory (or a single file) into an archive.
    Pack {
        /// Source directory.
        source: PathBuf,
        /// Output archive.
        #[arg(default_value = "archive.tar")]
        archive: PathBuf,
    },

    /// Restore the tree stored in an archive.
    Unpack {
        archive: PathBuf,
        /// New name for the restored root. Defaults to the root stored in the archive.
        output: Option<PathBuf>,
        /// Refuse records that would land outside the restored root.
        #[arg(long, default_value_t = false)]
        safe_paths: bool,
    },

    /// List entries in an archive.
    List {
        archive: PathBuf,
        /// Print kind, size and content hash too.
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },

    /// Check that an archive is complete and well-formed.
    Verify { archive: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut prompt: Box<dyn OverwritePrompt> = if cli.yes {
        Box::new(Assume(true))
    } else {
        Box::new(Interactive)
    };

    let res = match cli.cmd {
        Command::Ui => ui::run(),
        Command::Pack { source, archive } => run_pack(&source, &archive, cli.quiet, prompt.as_mut()),
        Command::Unpack {
            archive,
            output,
            safe_paths,
        } => run_unpack(&archive, output.as_deref(), safe_paths, cli.quiet, prompt.as_mut()),
        Command::List { archive, verbose } => {
            archive::list(&archive, verbose).map_err(archive::Error::from)
        }
        Command::Verify { archive } => archive::verify(&archive)
            .map(|r| {
                println!(
                    "ok: {} entries ({} dirs, {} files, {} bytes)",
                    r.entries(),
                    r.directories,
                    r.files,
                    r.content_bytes
                )
            })
            .map_err(archive::Error::from),
    };

    if let Err(e) = res {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn require_exists(p: &Path) -> archive::Result<()> {
    if archive::path_exists(p) {
        return Ok(());
    }
    Err(archive::Error::Missing(p.to_path_buf()))
}

pub(crate) fn run_pack(
    source: &Path,
    archive_path: &Path,
    quiet: bool,
    prompt: &mut dyn OverwritePrompt,
) -> archive::Result<()> {
    require_exists(source)?;
    if !archive::prepare_pack_destination(source, archive_path, prompt)? {
        println!("cancelled");
        return Ok(());
    }

    archive::pack_with_progress(source, archive_path, &mut |p: &Progress<'_>| {
        if !quiet {
            println!("packed: {}", p.path.display());
        }
    })?;
    println!("{} was successfully packed.", archive_path.display());
    Ok(())
}

pub(crate) fn run_unpack(
    archive_path: &Path,
    output: Option<&Path>,
    safe_paths: bool,
    quiet: bool,
    prompt: &mut dyn OverwritePrompt,
) -> archive::Result<()> {
    require_exists(archive_path)?;

    let dest = match output {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => archive::root_path(archive_path)?,
    };
    if !archive::prepare_unpack_destination(archive_path, &dest, prompt)? {
        println!("cancelled");
        return Ok(());
    }

    let mut on_progress = |p: &Progress<'_>| {
        if !quiet {
            println!("unpacked: {}", p.path.display());
        }
    };
    let mut unpacker = archive::Unpacker::new(archive_path)
        .reject_unsafe_paths(safe_paths)
        .on_progress(&mut on_progress);
    if let Some(out) = output {
        unpacker = unpacker.output_root(out);
    }
    unpacker.run()?;

    println!("{} was successfully unpacked.", dest.display());
    Ok(())
}
