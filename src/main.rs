use clap::{Parser, Subcommand};
use filemagic::{
    results_to_string, Flag, FlagSet, IdentifyResults, Magic, MagicConfig, DEFAULT_DATABASE_SOURCE,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "filemagic", version, about = "Identify file types with libmagic")]
struct Cli {
    /// Log handle activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify files; directories are walked recursively
    Identify {
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,
        /// Report MIME type and encoding instead of a description
        #[arg(short, long)]
        mime: bool,
        /// Comma separated flag names, e.g. "symlink, compress"
        #[arg(short, long)]
        flags: Option<FlagSet>,
        /// Database to load (default: the configured or built-in one)
        #[arg(short, long)]
        database: Option<PathBuf>,
        /// TOML file with database_file, flags and parameters
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Follow symbolic links while walking directories
        #[arg(short = 'L', long)]
        follow_symlinks: bool,
        /// Emit a JSON object instead of text
        #[arg(long)]
        json: bool,
    },
    /// Validate a source database (default: the bundled source)
    Check {
        database: Option<PathBuf>,
    },
    /// Compile a source database into <name>.mgc in the current directory
    Compile {
        database: Option<PathBuf>,
    },
    /// Print the engine's parameter values
    Params,
    /// List every flag name
    Flags,
    /// Print the linked libmagic version
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {

        // ── Identify ─────────────────────────────────────────────────────────
        Commands::Identify { paths, mime, flags, database, config, follow_symlinks, json } => {
            let mut config = match config {
                Some(path) => MagicConfig::load(path)?,
                None       => MagicConfig { flags: FlagSet::new(), ..MagicConfig::default() },
            };
            if let Some(flags) = flags {
                config.flags = flags;
            }
            if mime {
                config.flags.insert(Flag::Mime);
            }
            if let Some(database) = database {
                config.database_file = database;
            }

            let magic = Magic::from_config(&config)?;
            let mut results = IdentifyResults::new();
            for path in &paths {
                if path.is_dir() {
                    results.extend(magic.identify_directory_each(path, follow_symlinks, None));
                } else {
                    results.insert(path.clone(), magic.identify_file(path));
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&results_to_json(&results))?);
            } else {
                println!("{}", results_to_string(&results, ": ", "\n"));
            }

            let failed = results.values().filter(|r| r.is_err()).count();
            if failed > 0 {
                return Err(format!("{failed} of {} file(s) could not be identified", results.len()).into());
            }
        }

        // ── Check ────────────────────────────────────────────────────────────
        Commands::Check { database } => {
            let database = database.unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_SOURCE));
            Magic::open_with(Flag::None)?.try_check(&database)?;
            println!("{}: ok", database.display());
        }

        // ── Compile ──────────────────────────────────────────────────────────
        Commands::Compile { database } => {
            let database = database.unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_SOURCE));
            Magic::open_with(Flag::None)?.try_compile(&database)?;
            println!("Compiled: {}", database.display());
        }

        // ── Params ───────────────────────────────────────────────────────────
        Commands::Params => {
            let parameters = Magic::open_with(Flag::None)?.get_parameters()?;
            for (parameter, value) in parameters.iter() {
                println!("{:<16} {}", parameter.name(), value);
            }
        }

        // ── Flags ────────────────────────────────────────────────────────────
        Commands::Flags => {
            for flag in Flag::ALL {
                println!("{:#010x}  {}", flag.bit(), flag.name());
            }
        }

        // ── Version ──────────────────────────────────────────────────────────
        Commands::Version => {
            println!("libmagic {}", filemagic::version());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let default = if verbose { "filemagic=debug" } else { "filemagic=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn results_to_json(results: &IdentifyResults) -> serde_json::Value {
    let entries = results
        .iter()
        .map(|(path, result)| {
            let value = match result {
                Ok(file_type) => serde_json::json!({ "type": file_type }),
                Err(err)      => serde_json::json!({ "error": err.to_string() }),
            };
            (path.display().to_string(), value)
        })
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(entries)
}
