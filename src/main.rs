use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use galleria::config::Config;
use galleria::gallery::Gallery;
use galleria::logging;

enum Command {
    Sync,
    List { tag: Option<String>, json: bool },
    Tags { file: PathBuf },
    TagAdd { sha: String, tag: String },
    TagRemove { sha: String, tag: String },
    RenameAll,
    Repair,
    Prune,
    Thumbnails,
}

struct Args {
    config_path: Option<PathBuf>,
    root: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config_path = None;
    let mut root = None;
    let mut rest = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("galleria {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                config_path = Some(PathBuf::from(value_after(&args, i, "--config")));
                i += 1;
            }
            "--root" | "-r" => {
                root = Some(PathBuf::from(value_after(&args, i, "--root")));
                i += 1;
            }
            _ => rest.push(args[i].clone()),
        }
        i += 1;
    }

    let command = parse_command(&rest);
    Args {
        config_path,
        root,
        command,
    }
}

fn parse_command(rest: &[String]) -> Command {
    let words: Vec<&str> = rest.iter().map(String::as_str).collect();
    match words.as_slice() {
        ["sync"] => Command::Sync,
        ["list", options @ ..] => {
            let mut tag = None;
            let mut json = false;
            let mut i = 0;
            while i < options.len() {
                match options[i] {
                    "--json" => json = true,
                    "--tag" => {
                        tag = Some(value_after(rest, i + 1, "--tag"));
                        i += 1;
                    }
                    other => usage_error(&format!("Unknown list option: {}", other)),
                }
                i += 1;
            }
            Command::List { tag, json }
        }
        ["tags", file] => Command::Tags {
            file: PathBuf::from(file),
        },
        ["tag", "add", sha, tag] => Command::TagAdd {
            sha: sha.to_string(),
            tag: tag.to_string(),
        },
        ["tag", "rm", sha, tag] => Command::TagRemove {
            sha: sha.to_string(),
            tag: tag.to_string(),
        },
        ["rename-all"] => Command::RenameAll,
        ["repair"] => Command::Repair,
        ["prune"] => Command::Prune,
        ["thumbnails"] => Command::Thumbnails,
        [] => usage_error("No command given"),
        _ => usage_error(&format!("Unknown command: {}", rest.join(" "))),
    }
}

fn value_after(args: &[String], i: usize, flag: &str) -> String {
    match args.get(i + 1) {
        Some(value) => value.clone(),
        None => usage_error(&format!("{} requires a value", flag)),
    }
}

fn usage_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    print_help();
    std::process::exit(1);
}

fn print_help() {
    println!(
        r#"galleria - local image gallery with content-addressed tags

USAGE:
    galleria [OPTIONS] <COMMAND>

COMMANDS:
    sync                    Scan the library and sync the tag store
    list [--tag T] [--json] List images with their tags
    tags <FILE>             Show the tags stored for a file's content
    tag add <SHA> <TAG>     Add a tag to an image
    tag rm <SHA> <TAG>      Remove a tag from an image
    rename-all              Rename every image to a timestamp name
    repair                  Finish renames left incomplete by an earlier run
    prune                   Delete store records whose file is gone
    thumbnails              Generate missing thumbnails

OPTIONS:
    --config, -c PATH       Path to config file
    --root, -r DIR          Library directory (overrides the config)
    --version, -V           Show version
    --help, -h              Show this help message

ENVIRONMENT:
    GALLERIA_CONFIG         Path to config file (overrides default location)
    GALLERIA_LOG            Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/galleria/config.toml"#
    );
}

fn main() -> Result<()> {
    let args = parse_args();

    // Journald on Linux, stderr otherwise
    let _ = logging::init(None);

    let mut config = match args.config_path {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(root) = args.root {
        config.library.root = root;
    }

    let gallery = Gallery::open(config).context("Failed to open the tag store")?;

    let (repair, sync) = gallery
        .startup()
        .with_context(|| format!("Failed to scan {}", gallery.config().library_root().display()))?;
    info!(
        "Startup: {} renames repaired, {} new images, {} renamed on disk",
        repair.completed, sync.inserted, sync.renamed
    );

    run(&gallery, args.command)
}

fn run(gallery: &Gallery, command: Command) -> Result<()> {
    match command {
        // Startup already synced
        Command::Sync => {
            println!("Library synced");
        }
        Command::List { tag, json } => {
            let listing = gallery.list(tag.as_deref());
            for diagnostic in &listing.diagnostics {
                eprintln!("Warning: {}", diagnostic);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&listing.images)?);
            } else {
                for image in &listing.images {
                    println!("{}\t{}\t{}", image.fingerprint, image.name, image.tags.join(", "));
                }
                if !listing.orphans.is_empty() {
                    eprintln!("{} store records have no file on disk", listing.orphans.len());
                }
            }
        }
        Command::Tags { file } => {
            let tags = gallery
                .tags_for_file(&file)
                .with_context(|| format!("Failed to look up {}", file.display()))?;
            for tag in tags {
                println!("{}", tag);
            }
        }
        Command::TagAdd { sha, tag } => {
            if !gallery.add_tag(&sha, &tag)? {
                println!("{} already tagged {:?}", sha, tag);
            }
        }
        Command::TagRemove { sha, tag } => {
            if !gallery.remove_tag(&sha, &tag)? {
                println!("{} has no tag {:?}", sha, tag);
            }
        }
        Command::RenameAll => {
            let report = gallery.rename_all().context("Failed to rename")?;
            println!(
                "Renamed {} files ({} unchanged)",
                report.renamed.len(),
                report.unchanged
            );
            for failure in &report.failures {
                eprintln!("Warning: {} ({} step): {}", failure.file, failure.step, failure.message);
            }
        }
        Command::Repair => {
            let report = gallery.repair()?;
            println!(
                "{} completed, {} discarded, {} still pending",
                report.completed, report.discarded, report.still_pending
            );
        }
        Command::Prune => {
            let removed = gallery.prune_orphans()?;
            for record in &removed {
                println!("Removed {} ({})", record.name, record.fingerprint);
            }
        }
        Command::Thumbnails => {
            let report = gallery.generate_missing_thumbnails()?;
            println!("{} generated, {} failed", report.generated, report.failed);
        }
    }
    Ok(())
}
