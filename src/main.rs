use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, error, warn};

use stock_catalog::engine::MoveOutcome;
use stock_catalog::state::data::{ImageRef, Location, NodeKind, NodeRef};
use stock_catalog::state::library::Library;
use stock_catalog::state::sheet::SheetStore;
use stock_catalog::{Backend, Catalog, CatalogError, CatalogResult, CatalogStore, Config, Response};

/// Stock catalog - categories, items and their paths
#[derive(Parser, Debug)]
#[command(name = "stock")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Storage backend to open
    #[arg(long, value_enum, env = "STOCK_BACKEND", global = true)]
    backend: Option<Backend>,

    /// SQLite database file
    #[arg(long, env = "STOCK_DB", global = true)]
    database: Option<PathBuf>,

    /// Workbook file used by the sheet backend
    #[arg(long, env = "STOCK_WORKBOOK", global = true)]
    workbook: Option<PathBuf>,

    /// Blank sheet rows tolerated before compaction
    #[arg(long, env = "STOCK_COMPACT_THRESHOLD", global = true)]
    compact_threshold: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn config(&self) -> Config {
        let defaults = Config::default();
        Config {
            backend: self.backend.unwrap_or(defaults.backend),
            database: self.database.clone().unwrap_or(defaults.database),
            workbook: self.workbook.clone().unwrap_or(defaults.workbook),
            compact_threshold: self.compact_threshold.unwrap_or(defaults.compact_threshold),
        }
    }
}

/// Where a new node goes; the root when neither flag is given
#[derive(clap::Args, Debug)]
struct ParentArgs {
    /// Absolute path of the parent category
    #[arg(long, conflicts_with = "parent_id")]
    parent: Option<String>,

    /// Id of the parent category
    #[arg(long)]
    parent_id: Option<i64>,
}

impl ParentArgs {
    fn location(self) -> Location {
        match (self.parent_id, self.parent) {
            (Some(id), _) => Location::Id(id),
            (None, Some(path)) => Location::Path(path),
            (None, None) => Location::Root,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a category
    Mkdir {
        name: String,
        #[command(flatten)]
        parent: ParentArgs,
    },

    /// Create an empty item
    Add {
        name: String,
        #[command(flatten)]
        parent: ParentArgs,
    },

    /// Move a category or item under the category at DEST
    Mv { kind: NodeKind, id: String, dest: String },

    /// Delete an item, or an empty category with its sub-categories
    Rm { kind: NodeKind, id: String },

    /// Rename an item and set its count from an expression such as 2+3*4
    Edit {
        uid: String,
        name: String,
        /// May start with a sign, e.g. -2+5
        #[arg(allow_hyphen_values = true)]
        count: String,
    },

    /// Attach an image to an item
    ImageAdd {
        uid: String,
        thumb: String,
        full: String,
        /// Backend handle of the stored file
        #[arg(long)]
        handle: Option<String>,
    },

    /// Detach the image at INDEX from an item
    ImageRm { uid: String, index: usize },

    /// Resolve an absolute path to a category id
    Resolve { path: String },

    /// Breadcrumb path of a category, or of the category holding an item
    Path { kind: NodeKind, id: String },

    /// List one category
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Show one item
    Show { uid: String },

    /// Every category and item with its path
    Index,

    /// Dump both tables
    Export,

    /// Drop blank rows from the workbook (sheet backend)
    Compact,
}

fn node_ref(kind: NodeKind, id: String) -> CatalogResult<NodeRef> {
    match kind {
        NodeKind::Item => Ok(NodeRef::Item(id)),
        NodeKind::Category => id
            .trim()
            .parse()
            .map(NodeRef::Category)
            .map_err(|_| CatalogError::NotFound(format!("category {}", id))),
    }
}

/// Run one catalog command against any backend
fn run<S: CatalogStore>(catalog: &mut Catalog<S>, command: Command) -> CatalogResult<Response> {
    let response = match command {
        Command::Mkdir { name, parent } => {
            let id = catalog.create_category(&name, &parent.location())?;
            Response::ok("Category created").with("id", id)
        }
        Command::Add { name, parent } => {
            let uid = catalog.create_item(&name, &parent.location())?;
            Response::ok("Item created").with("uid", uid)
        }
        Command::Mv { kind, id, dest } => {
            let node = node_ref(kind, id)?;
            let outcome = catalog.move_node(&node, &dest)?;
            let message = match outcome {
                MoveOutcome::Moved => format!("Moved {}", node),
                MoveOutcome::Unchanged => format!("{} is already there", node),
            };
            Response::ok(message).with("outcome", outcome)
        }
        Command::Rm { kind, id } => {
            let node = node_ref(kind, id)?;
            let removed = catalog.delete(&node)?;
            Response::ok(format!("Deleted {}", node)).with("removed", removed)
        }
        Command::Edit { uid, name, count } => {
            let item = catalog.edit_item(&uid, &name, &count)?;
            Response::ok("Item updated").with("item", item)
        }
        Command::ImageAdd {
            uid,
            thumb,
            full,
            handle,
        } => {
            let item = catalog.add_image(&uid, ImageRef { thumb, full, handle })?;
            Response::ok("Image added").with("item", item)
        }
        Command::ImageRm { uid, index } => {
            let image = catalog.remove_image(&uid, index)?;
            Response::ok("Image removed").with("image", image)
        }
        Command::Resolve { path } => {
            let id = catalog.resolve_path(&path)?;
            Response::ok("Resolved").with("id", id)
        }
        Command::Path { kind, id } => {
            let path = catalog.get_path(&node_ref(kind, id)?)?;
            Response::ok("Path found").with("path", path)
        }
        Command::Ls { path } => {
            let listing = catalog.list(&Location::Path(path))?;
            Response::ok("Listed").with("listing", listing)
        }
        Command::Show { uid } => {
            let item = catalog.get_item(&uid)?;
            Response::ok("Item found").with("item", item)
        }
        Command::Index => {
            let index = catalog.search_index()?;
            Response::ok(format!("{} entries", index.len())).with("entries", index)
        }
        Command::Export => {
            let export = catalog.export()?;
            Response::ok("Exported")
                .with("categories", export.categories)
                .with("items", export.items)
        }
        Command::Compact => Response::ok("Nothing to compact").with("removed", 0),
    };
    Ok(response)
}

fn dispatch(config: &Config, command: Command) -> CatalogResult<Response> {
    debug!("Opening {:?} store at {}", config.backend, config.store_path().display());
    match config.backend {
        Backend::Sqlite => {
            let mut catalog = Catalog::new(Library::open(&config.database)?);
            run(&mut catalog, command)
        }
        Backend::Sheet => {
            let mut store = SheetStore::open(&config.workbook, config.compact_threshold)?;
            if let Command::Compact = command {
                let removed = store.compact()?;
                return Ok(Response::ok(format!("Removed {} blank rows", removed)).with("removed", removed));
            }
            run(&mut Catalog::new(store), command)
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    let response = match dispatch(&config, cli.command) {
        Ok(response) => response,
        Err(err) => {
            if err.is_storage() {
                error!("❌ Storage unavailable: {}", err);
            } else {
                warn!("⚠️  Rejected: {}", err);
            }
            Response::failure(&err)
        }
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", response.to_json()).context("writing response")?;
    Ok(ExitCode::from(response.exit_code() as u8))
}
