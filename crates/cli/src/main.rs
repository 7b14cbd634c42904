use anyhow::Result;
use clap::{Parser, Subcommand};
use unalias::commands::{
    cache_info_command, discover_command, init_config_command, resolve_command,
};
use unalias::ConfigArgs;

/// Recover the aliased export names of an IL2CPP runtime library.
///
/// This CLI is a thin wrapper around `unalias-core` (exposed in code as `unalias_core`).
/// It runs the same discovery the in-process host runs, but offline against a copy of the
/// host binary, and shares its cache files.
#[derive(Parser, Debug)]
#[command(
    name = "unalias",
    version,
    about = "Recover aliased IL2CPP export names from the host binary",
    long_about = None
)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run discovery against a PE file and print the extracted name table.
    ///
    /// The table is written to the cache (fingerprinted by the target library's size) unless
    /// `--no-cache` is given.
    Discover {
        /// Host binary to scan (e.g. UnityPlayer.dll).
        #[arg(long)]
        image: String,

        #[command(flatten)]
        config: ConfigArgs,

        /// Do not write the cache files.
        #[arg(long, default_value_t = false)]
        no_cache: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Disassemble the reference, the call and the start of the table routine.
        #[arg(long, default_value_t = false)]
        disasm: bool,

        /// Write the raw bytes around the anchor to this file.
        #[arg(long)]
        dump_anchor: Option<String>,
    },

    /// Translate true export names to the names the host exports them under.
    ///
    /// Uses the cache when it is fresh, otherwise discovers from `--image`.
    Resolve {
        /// Host binary to scan when the cache is cold.
        #[arg(long)]
        image: String,

        #[command(flatten)]
        config: ConfigArgs,

        /// True-name list to use instead of the one in the cache dir.
        #[arg(long)]
        true_names: Option<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Names to translate.
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Show the cache files and whether they match the current target library.
    CacheInfo {
        #[command(flatten)]
        config: ConfigArgs,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Write the default configuration (JSON or YAML, by extension).
    InitConfig {
        /// Output file.
        #[arg(long, default_value = "unalias.json")]
        out: String,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Discover { image, config, no_cache, json, disasm, dump_anchor } => {
            discover_command(&image, &config, no_cache, json, disasm, dump_anchor.as_deref())?
        }
        Command::Resolve { image, config, true_names, json, names } => {
            resolve_command(&image, &config, true_names.as_deref(), &names, json)?
        }
        Command::CacheInfo { config, json } => cache_info_command(&config, json)?,
        Command::InitConfig { out, force } => init_config_command(&out, force)?,
    }

    Ok(())
}
