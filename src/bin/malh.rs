//! Thin CLI front-end over the `malhdb` library: create, insert, select,
//! stats. Grounded in the teacher's `main.rs` (env-based logger init,
//! top-level error handler) and `cli.rs` (clap derive subcommands),
//! narrowed to the handful of operations this format exposes.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use log::error;

use malhdb::{Mode, Relation, RelationConfig};

fn init_logger() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[derive(Parser, Debug)]
#[command(name = "malh", version, about = "Multi-attribute linear-hashed file store")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a new relation.
    Create {
        #[arg(long)]
        name: PathBuf,
        #[arg(long)]
        nattrs: u32,
        /// Initial number of primary pages (should equal 2^d0).
        #[arg(long, default_value_t = 1)]
        npages0: u64,
        #[arg(long, default_value_t = 0)]
        d0: u32,
        /// Choice-vector spec, e.g. "0:0,1:0,0:1,1:1".
        #[arg(long)]
        cv: String,
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Insert one tuple (comma-separated fields, no `?`).
    Insert {
        #[arg(long)]
        name: PathBuf,
        #[arg(long)]
        tuple: String,
    },

    /// Partial-match query; fields may be `?`.
    Select {
        #[arg(long)]
        name: PathBuf,
        #[arg(long)]
        template: String,
    },

    /// Print relation diagnostics.
    Stats {
        #[arg(long)]
        name: PathBuf,
    },
}

fn main() {
    init_logger();
    if let Err(e) = run() {
        error!("{:?}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Create {
            name,
            nattrs,
            npages0,
            d0,
            cv,
            page_size,
        } => {
            let mut cfg = RelationConfig::from_env();
            if let Some(ps) = page_size {
                cfg = cfg.with_page_size(ps);
            }
            Relation::create(&name, nattrs, npages0, d0, &cv, &cfg)?;
            println!("created relation {}", name.display());
            Ok(())
        }

        Cmd::Insert { name, tuple } => {
            let cfg = RelationConfig::from_env();
            let mut rel = Relation::open(&name, Mode::Write, &cfg)?;
            let bucket = rel.insert(&tuple)?;
            rel.close()?;
            println!("inserted into bucket {bucket}");
            Ok(())
        }

        Cmd::Select { name, template } => {
            let cfg = RelationConfig::from_env();
            let mut rel = Relation::open(&name, Mode::Read, &cfg)?;
            let mut query = rel.start_query(&template)?;
            let mut count = 0u64;
            while let Some(t) = query.next()? {
                println!("{t}");
                count += 1;
            }
            drop(query);
            rel.close()?;
            eprintln!("{count} tuple(s)");
            Ok(())
        }

        Cmd::Stats { name } => {
            let cfg = RelationConfig::from_env();
            let mut rel = Relation::open(&name, Mode::Read, &cfg)?;
            rel.print_stats()?;
            rel.close()?;
            Ok(())
        }
    }
}
