use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use dbsift_core::ObjectKind;

mod commands;

use commands::reconcile::{MembershipArg, OutputFormat};
use commands::Sources;

#[derive(Parser, Debug)]
#[command(name = "dbsift", version, about = "Decide which database objects to import")]
struct Cli {
    /// Project file (dbsift.yaml) pointing at rules and snapshot
    #[arg(long, short = 'c', global = true, env = "DBSIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Rules file; overrides the project file's rules
    #[arg(long, global = true, env = "DBSIFT_RULES")]
    rules: Option<PathBuf>,

    /// Schema snapshot file; overrides the project file's snapshot
    #[arg(long, global = true, env = "DBSIFT_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile the rules and report invalid patterns and malformed nesting
    Check,

    /// Decide whether a single object is included
    Decide {
        /// Object kind: catalog, schema, table, column or procedure
        kind: ObjectKind,

        /// Object name
        name: String,

        #[arg(long)]
        catalog: Option<String>,

        #[arg(long)]
        schema: Option<String>,

        /// Owning table (columns only)
        #[arg(long)]
        table: Option<String>,
    },

    /// Annotate every object of the snapshot as included, excluded or undetermined
    Reconcile {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Only list objects with this membership
        #[arg(long, value_enum)]
        only: Option<MembershipArg>,

        /// Show which rules describe each object
        #[arg(long, default_value_t = false)]
        show_matches: bool,
    },

    /// Generate a rules file that includes everything in the snapshot
    Scaffold {
        /// Write to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let sources = Sources::new(cli.config, cli.rules, cli.snapshot);

    match cli.cmd {
        Command::Check => commands::check::run(&sources)?,
        Command::Decide {
            kind,
            name,
            catalog,
            schema,
            table,
        } => commands::decide::run(
            &sources,
            kind,
            &name,
            catalog.as_deref(),
            schema.as_deref(),
            table.as_deref(),
        )?,
        Command::Reconcile {
            format,
            only,
            show_matches,
        } => commands::reconcile::run(&sources, format, only, show_matches)?,
        Command::Scaffold { output, force } => {
            commands::scaffold::run(&sources, output.as_deref(), force)?
        }
    }

    Ok(())
}
