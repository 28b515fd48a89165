//! neckstudio - fretboard diagram studio for the terminal.
//!
//! Operates on a project JSON file, keeping a local cache next to it so a
//! project whose file becomes unreadable can still be recovered.
//!
//! # Usage
//!
//! ```bash
//! neckstudio                              # Show the active tab
//! neckstudio add E "Minor Pentatonic" "Position 1"
//! neckstudio import scales.json
//! neckstudio export-page page.json
//! neckstudio --project bass.json --new show
//! ```

use anyhow::{bail, Context, Result};
use neckstudio::app::Studio;
use neckstudio::neck::{
    export_file_name, title_from_file_name, DiagramId, ImportError, Library, LibraryItemType,
};
use neckstudio::render::render_active_tab;
use neckstudio::store::JsonFileStore;
use std::path::{Path, PathBuf};

const DEFAULT_PROJECT_PATH: &str = ".neckstudio.json";

/// What to do with the project.
#[derive(Debug, PartialEq)]
enum Command {
    Show,
    Add {
        key: Option<String>,
        scale: Option<String>,
        position: Option<String>,
    },
    Import(PathBuf),
    ExportPage(Option<PathBuf>),
    ExportDiagram {
        id: String,
        path: Option<PathBuf>,
    },
}

/// Command-line options for the application.
#[derive(Debug)]
struct CliOptions {
    /// Project file to open.
    project: PathBuf,
    /// Start over with a blank project.
    new_project: bool,
    command: Command,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--project <path>` or `-p <path>`: Project file (default `.neckstudio.json`)
    /// - `--new` or `-n`: Replace the project with a blank one
    /// - `--help` or `-h`: Print help and exit
    /// - a subcommand and its arguments
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    fn from_args(args: &[String]) -> Result<Self> {
        let mut project = PathBuf::from(DEFAULT_PROJECT_PATH);
        let mut new_project = false;
        let mut positional: Vec<String> = Vec::new();
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--new" | "-n" => new_project = true,
                "--project" | "-p" => {
                    i += 1;
                    let Some(path) = args.get(i) else {
                        bail!("--project requires a path argument");
                    };
                    project = PathBuf::from(path);
                }
                "--help" | "-h" => {
                    print_help(args.first().map(String::as_str).unwrap_or("neckstudio"));
                    std::process::exit(0);
                }
                other if other.starts_with('-') && other.len() > 1 => {
                    bail!("Unknown option: {other}\nUse --help for usage information");
                }
                other => positional.push(other.to_string()),
            }
            i += 1;
        }

        Ok(Self {
            project,
            new_project,
            command: parse_command(&positional)?,
        })
    }
}

fn parse_command(args: &[String]) -> Result<Command> {
    let arg = |index: usize| args.get(index).cloned();
    let Some(name) = args.first() else {
        return Ok(Command::Show);
    };
    let command = match name.as_str() {
        "show" => Command::Show,
        "add" => Command::Add {
            key: arg(1),
            scale: arg(2),
            position: arg(3),
        },
        "import" => match arg(1) {
            Some(path) => Command::Import(PathBuf::from(path)),
            None => bail!("import requires a file"),
        },
        "export-page" => Command::ExportPage(arg(1).map(PathBuf::from)),
        "export-diagram" => match arg(1) {
            Some(id) => Command::ExportDiagram {
                id,
                path: arg(2).map(PathBuf::from),
            },
            None => bail!("export-diagram requires a diagram id"),
        },
        other => bail!("Unknown command: {other}\nUse --help for usage information"),
    };
    Ok(command)
}

fn print_help(program: &str) {
    eprintln!("neckstudio - Fretboard diagram studio");
    eprintln!();
    eprintln!("Usage: {program} [OPTIONS] [COMMAND]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  show                               Print the diagrams of the active tab (default)");
    eprintln!("  add [KEY] [SCALE] [POSITION]       Add a diagram for a key, scale and position");
    eprintln!("  import FILE                        Import pages or diagrams from JSON");
    eprintln!("  export-page [FILE]                 Export the active tab as a page");
    eprintln!("  export-diagram ID [FILE]           Export one diagram");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -p, --project PATH   Project file (default {DEFAULT_PROJECT_PATH})");
    eprintln!("  -n, --new            Start with a new blank project");
    eprintln!("  -h, --help           Print this help message");
    eprintln!();
    eprintln!("Set RUST_LOG=debug to see what the studio repairs and saves.");
}

/// Local cache location for a project file.
fn cache_path(project: &Path) -> PathBuf {
    let mut name = project
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| DEFAULT_PROJECT_PATH.into());
    name.push(".cache");
    project.with_file_name(name)
}

/// Finds a library item by id or by case-insensitive name.
fn find_item(library: &Library, types: &[LibraryItemType], query: &str) -> Result<String> {
    library
        .items()
        .iter()
        .filter(|item| types.contains(&item.item_type))
        .find(|item| item.id == query || item.name.eq_ignore_ascii_case(query.trim()))
        .map(|item| item.id.clone())
        .with_context(|| {
            let kind = types.first().map_or("library item", |t| t.as_str());
            format!("No {kind} named '{query}'")
        })
}

fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let remote = JsonFileStore::new(&cli.project);
    let local = JsonFileStore::new(cache_path(&cli.project));
    let mut studio = Studio::open(Box::new(remote), Box::new(local));

    if cli.new_project {
        studio.new_project(false);
    }

    let changed = run(&mut studio, cli.command)?;

    if changed || cli.new_project {
        studio.force_save();
        if !studio.is_remote_healthy() {
            eprintln!(
                "Warning: could not write {}, changes kept in the local cache",
                cli.project.display()
            );
        }
    }
    Ok(())
}

/// Executes a command.
///
/// # Returns
///
/// true if the project was modified
fn run(studio: &mut Studio, command: Command) -> Result<bool> {
    match command {
        Command::Show => {
            print!("{}", render_active_tab(studio.data(), studio.library()));
            Ok(false)
        }
        Command::Add {
            key,
            scale,
            position,
        } => {
            let selections = [
                (key, &[LibraryItemType::Key][..]),
                (scale, &[LibraryItemType::Scale, LibraryItemType::Mode][..]),
                (position, &[LibraryItemType::Position][..]),
            ];
            for (query, types) in selections {
                if let Some(query) = query {
                    let id = find_item(studio.library(), types, &query)?;
                    studio.select_library_item(&id);
                }
            }
            let id = studio.add_diagram_from_theory(None);
            let name = studio.data().diagram(&id).map(|d| d.name.clone()).unwrap_or_default();
            println!("Added {name} ({id})");
            Ok(true)
        }
        Command::Import(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let fallback = title_from_file_name(
                &path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            );
            match studio.import_pages(&text, &fallback) {
                Ok(()) => {}
                Err(ImportError::NoProject) => studio
                    .import_diagrams(&text)
                    .with_context(|| format!("Failed to import {}", path.display()))?,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to import {}", path.display()))
                }
            }
            println!(
                "Imported {} ({} diagrams in project)",
                path.display(),
                studio.data().diagrams.len()
            );
            Ok(true)
        }
        Command::ExportPage(path) => {
            let page = studio.export_page()?;
            let path = path
                .unwrap_or_else(|| PathBuf::from(export_file_name(&page.title, "neck-diagram")));
            let json = serde_json::to_string_pretty(&page)?;
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported page to {}", path.display());
            Ok(false)
        }
        Command::ExportDiagram { id, path } => {
            let export = studio
                .export_diagram(&DiagramId::from(id.as_str()))
                .with_context(|| format!("No diagram with id {id}"))?;
            let path = path.unwrap_or_else(|| {
                PathBuf::from(export_file_name(&export.diagram.name, "diagram"))
            });
            let json = serde_json::to_string_pretty(&export)?;
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported diagram to {}", path.display());
            Ok(false)
        }
    }
}
