use clap::{Parser, Subcommand};
use pageflow::align::{AlignOptions, ConflictPolicy, align};
use pageflow::config::StepConfig;
use pageflow::index::MemoryIndex;
use pageflow::process::{CopyTransform, run_step};
use pageflow::provenance::version_string;
use pageflow::resource::{
    InstallOptions, ResourceKind, install_resource, list_resources, resolve_resource,
};
use pageflow::output;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pageflow")]
#[command(about = "Align document collections page-by-page and run processing steps over them")]
#[command(long_about = "\
Align document collections page-by-page and run processing steps over them

A workspace is a directory with an index manifest (index.json) describing
every file: which collection it belongs to, which page it covers, its media
type, and where its content lives. Processing steps read aligned per-page
tuples from input collections and register stamped results into an output
collection.

Workspace structure:

  workspace/
  ├── index.json                   # File index manifest
  ├── SEG/                         # A collection of page documents
  │   ├── SEG_0001.json
  │   └── SEG_0002.json
  ├── IMG/                         # A collection of raw page images
  │   ├── IMG_0001.png
  │   └── IMG_0002.png
  └── OCR/                         # Output collection (written by 'run')

Typical session:

  pageflow align -I SEG,IMG             # preview the per-page alignment
  pageflow run --config step.toml       # execute a step end to end
  pageflow resource resolve fast.model --step my-ocr")]
#[command(version = version_string())]
struct Cli {
    /// Workspace directory holding the index manifest and file content
    #[arg(long, default_value = "workspace", global = true)]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Preview the per-page alignment of one or more collections
    Align {
        /// Input collections, comma-separated, slot order
        #[arg(short = 'I', long, value_delimiter = ',')]
        input_collections: Vec<String>,
        /// Restrict to these page ids (comma-separated)
        #[arg(long, value_delimiter = ',')]
        page_id: Vec<String>,
        /// Media type filter: literal, or a regex prefixed with //
        #[arg(long)]
        media_type: Option<String>,
        /// Also emit pages missing from the first collection
        #[arg(long)]
        any_first: bool,
        /// Duplicate handling: abort, skip, keep-first or keep-last
        #[arg(long, default_value = "abort", value_parser = parse_policy)]
        on_conflict: ConflictPolicy,
    },
    /// Run a processing step: align, transform each page, register outputs
    Run {
        /// Step configuration (TOML)
        #[arg(long)]
        config: PathBuf,
    },
    /// Manage step resources (models, dictionaries)
    Resource {
        #[command(subcommand)]
        command: ResourceCommand,
    },
}

#[derive(Subcommand)]
enum ResourceCommand {
    /// Resolve a resource name to an absolute path
    Resolve {
        name: String,
        /// Requesting processing step
        #[arg(long)]
        step: String,
    },
    /// Install a resource from a local file, directory or archive
    Install {
        source: PathBuf,
        #[arg(long)]
        step: String,
        /// Destination data directory
        #[arg(long, default_value = "resources")]
        basedir: PathBuf,
        /// Source kind: file, directory or archive
        #[arg(long, default_value = "file", value_parser = parse_kind)]
        kind: ResourceKind,
        /// Installed name (defaults to the source file name)
        #[arg(long)]
        name: Option<String>,
        /// Replace an existing installation
        #[arg(long)]
        overwrite: bool,
        /// For archives: inner path promoted to the resource root
        #[arg(long, default_value = ".")]
        path_in_archive: PathBuf,
    },
    /// List installed resources for a step
    List {
        #[arg(long)]
        step: String,
    },
}

fn parse_policy(s: &str) -> Result<ConflictPolicy, String> {
    match s {
        "abort" => Ok(ConflictPolicy::Abort),
        "skip" => Ok(ConflictPolicy::Skip),
        "keep-first" => Ok(ConflictPolicy::KeepFirst),
        "keep-last" => Ok(ConflictPolicy::KeepLast),
        other => Err(format!(
            "unknown conflict policy '{other}' (expected abort, skip, keep-first or keep-last)"
        )),
    }
}

fn parse_kind(s: &str) -> Result<ResourceKind, String> {
    match s {
        "file" => Ok(ResourceKind::File),
        "directory" => Ok(ResourceKind::Directory),
        "archive" => Ok(ResourceKind::Archive),
        other => Err(format!(
            "unknown resource kind '{other}' (expected file, directory or archive)"
        )),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let manifest_path = cli.workspace.join("index.json");

    match cli.command {
        Command::Align {
            input_collections,
            page_id,
            media_type,
            any_first,
            on_conflict,
        } => {
            let index = MemoryIndex::load(&manifest_path, &cli.workspace)?;
            let opts = AlignOptions {
                page_filter: if page_id.is_empty() {
                    None
                } else {
                    Some(page_id)
                },
                media_type_filter: media_type,
                require_first: !any_first,
                on_conflict,
            };
            let rows = align(&index, &input_collections, &opts)?;
            output::print_alignment(&rows, &input_collections);
        }
        Command::Run { config } => {
            let config = StepConfig::load(&config)?;
            let mut index = MemoryIndex::load(&manifest_path, &cli.workspace)?;
            let stats = run_step(&mut index, &config, &CopyTransform)?;
            index.save(&manifest_path)?;
            println!(
                "{} → {}: {}",
                config.input_collections.join(","),
                config.output_collection,
                stats
            );
        }
        Command::Resource { command } => match command {
            ResourceCommand::Resolve { name, step } => {
                let cwd = std::env::current_dir()?;
                let path = resolve_resource(&name, &step, &cwd, None)?;
                println!("{}", path.display());
            }
            ResourceCommand::Install {
                source,
                step,
                basedir,
                kind,
                name,
                overwrite,
                path_in_archive,
            } => {
                let opts = InstallOptions {
                    kind,
                    name,
                    overwrite,
                    path_in_archive,
                };
                let installed = install_resource(&source, &basedir, &step, &opts)?;
                println!("Installed {}", installed.display());
            }
            ResourceCommand::List { step } => {
                let paths = list_resources(&step, None);
                output::print_resources(&paths);
            }
        },
    }

    Ok(())
}
