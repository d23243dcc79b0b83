//! Exerciser CLI - evaluate expressions against JSON documents
//!
//! ```text
//! exerciser eval -i data.json -e 'Account.Order.Product.Price'
//! exerciser watch -i data.json --expr-file query.txt
//! exerciser session <id>
//! exerciser versions
//! exerciser format data.json
//! ```

mod commands;
mod context;

use clap::{Args, Parser, Subcommand};
use exerciser_core::{Backend, Origin};
use exerciser_libraries::ExternalLibrarySpec;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "exerciser")]
#[command(version, about = "Evaluate expressions against JSON documents", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "EXERCISER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate an expression once
    Eval {
        #[command(flatten)]
        document: DocumentArgs,

        #[command(flatten)]
        runtime: RuntimeArgs,

        /// Print the display text as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-evaluate whenever the input, expression or bindings files change
    Watch {
        #[command(flatten)]
        document: DocumentArgs,

        #[command(flatten)]
        runtime: RuntimeArgs,

        /// File holding a runtime version tag; editing it switches the runtime
        #[arg(long)]
        version_file: Option<PathBuf>,
    },

    /// Load a shared session by id and evaluate it
    Session {
        id: String,

        #[command(flatten)]
        runtime: RuntimeArgs,

        /// Print the display text as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the published runtime versions
    Versions {
        /// Offer the local development build first
        #[arg(long)]
        local: bool,
    },

    /// Reformat a JSON document with 2-space indentation
    Format {
        file: PathBuf,

        /// Rewrite the file instead of printing
        #[arg(long)]
        write: bool,
    },
}

/// The texts of one session
#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    /// Input document; `-` reads stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Expression to evaluate
    #[arg(short, long, conflicts_with = "expr_file")]
    pub expr: Option<String>,

    /// File holding the expression
    #[arg(long)]
    pub expr_file: Option<PathBuf>,

    /// Bindings file: a JSON object, `//` comment lines allowed
    #[arg(short, long)]
    pub bindings: Option<PathBuf>,

    /// Extension library as `<url>=<module name>` (repeatable)
    #[arg(long = "lib")]
    pub libs: Vec<ExternalLibrarySpec>,
}

/// Which runtime evaluates, and under which limits
#[derive(Args, Debug, Clone)]
pub struct RuntimeArgs {
    /// Evaluation backend: in-process or remote
    #[arg(long, default_value = "in-process")]
    pub backend: Backend,

    /// Runtime version tag; `local` selects the development build
    #[arg(long = "runtime-version", default_value = "latest")]
    pub version: String,

    /// Use a branch build of the runtime instead of a release
    #[arg(long, conflicts_with = "version")]
    pub branch: Option<String>,

    /// Seconds to wait for the runtime to load
    #[arg(long, default_value_t = 30)]
    pub ready_timeout: u64,

    /// Maximum evaluation depth
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Evaluation timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Remote evaluator URL
    #[arg(long)]
    pub remote_url: Option<String>,
}

impl RuntimeArgs {
    pub fn origin(&self) -> Origin {
        match &self.branch {
            Some(branch) => Origin::Branch(branch.clone()),
            None => Origin::parse(&self.version),
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,exerciser=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: could not start async runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let context = context::Context::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Eval {
            document,
            runtime,
            json,
        } => commands::eval(&context, &document, &runtime, json).await,
        Commands::Watch {
            document,
            runtime,
            version_file,
        } => commands::watch(&context, &document, &runtime, version_file.as_deref()).await,
        Commands::Session { id, runtime, json } => commands::session(&context, &id, &runtime, json).await,
        Commands::Versions { local } => commands::versions(&context, local).await,
        Commands::Format { file, write } => commands::format(&file, write),
    }
}
