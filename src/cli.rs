//! CLI (§4.14): `clap::Parser` derive over the five subcommands named in
//! the external interfaces. `--no-window`/`--overlay`/`--overlay-only`
//! gate UI modes that are out of scope here; they parse and are stored but
//! otherwise do nothing, so the surface matches the external contract.

use clap::{Parser, Subcommand};
use lootwarden::database::{Item, Store};

#[derive(Parser)]
#[command(name = "lootwarden", about = "ARPG passive loot-tracking engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize the data directory, config file, and Store database.
    Init {
        /// Path to a JSON file of items (`[{type_id, name, icon_ref, is_base_currency}, ...]`)
        /// to seed the Store with.
        #[arg(long)]
        seed: Option<String>,
    },
    /// Run the full engine: Collector, Cloud Sync Worker, and HTTP boundary.
    Serve {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long, default_value_t = false)]
        no_window: bool,
        #[arg(long, default_value_t = false)]
        portable: bool,
        #[arg(long, default_value_t = false)]
        overlay: bool,
        #[arg(long, default_value_t = false)]
        overlay_only: bool,
    },
    /// Run only the Collector's ingest loop, in the foreground.
    Tail {
        #[arg(long, default_value_t = false)]
        portable: bool,
    },
    /// Print the most recent runs for the active scope.
    ShowRuns {
        #[arg(long, default_value_t = false)]
        portable: bool,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Print current Slot State for the active scope.
    ShowState {
        #[arg(long, default_value_t = false)]
        portable: bool,
    },
}

pub fn seed_items_from_file(store: &Store, path: &str) -> Result<usize, String> {
    let contents = std::fs::read_to_string(path).map_err(|e| format!("failed to read seed file: {e}"))?;
    let items: Vec<Item> = serde_json::from_str(&contents).map_err(|e| format!("failed to parse seed file: {e}"))?;
    let count = items.len();
    for item in &items {
        store.upsert_item(item).map_err(|e| e.to_string())?;
    }
    Ok(count)
}
