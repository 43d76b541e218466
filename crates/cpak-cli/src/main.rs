//! cpak: decrypt key-table encrypted pak archives
//!
//! Commands:
//!   decrypt <input> <output>        - rewrite an encrypted pak as a plain ZIP archive
//!   list <input>                    - print entry names in directory order
//!   extract <input> <name>... [-o]  - write selected decrypted entry records
//!   config show                     - display current configuration
//!   explain <code>                  - describe a numeric error code
//!
//! The exit status is the numeric error code of the failure (0 on success).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use cpak_archive::{decrypt_archive_with, extract_entries_with, list_entries_with, DecryptOptions};
use cpak_core::config::CpakConfig;
use cpak_core::{ErrorCode, PakError};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "cpak",
    version,
    about = "Decrypt key-table encrypted pak archives",
    long_about = "cpak: unwrap a pak's RSA-wrapped key table, decrypt its entries and directory, \
                  and write a standard ZIP archive"
)]
struct Cli {
    /// Path to cpak config.toml
    #[arg(long, short = 'c', env = "CPAK_CONFIG", default_value = "/etc/cpak/config.toml")]
    config: PathBuf,

    /// RSA public key (PKCS#1 or SubjectPublicKeyInfo, DER or PEM); overrides keys.public_key
    #[arg(long, short = 'k', env = "CPAK_PUBLIC_KEY", global = true)]
    key: Option<PathBuf>,

    /// Log filter directive (overrides log.level)
    #[arg(long, env = "CPAK_LOG", global = true)]
    log: Option<String>,

    /// Log output format (overrides log.format)
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decrypt an archive into a plain ZIP file
    Decrypt {
        /// Encrypted input archive
        input: PathBuf,
        /// Destination for the decrypted archive
        output: PathBuf,
    },

    /// List entry names
    List {
        /// Encrypted input archive
        input: PathBuf,
    },

    /// Decrypt selected entries, one file per entry
    ///
    /// Each file holds the entry's decrypted local header, data, and data
    /// descriptor, exactly as they appear in the decrypted archive.
    Extract {
        /// Encrypted input archive
        input: PathBuf,
        /// Entry names to extract
        #[arg(required = true)]
        names: Vec<String>,
        /// Output directory (overrides extract.output_dir)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Describe a numeric error code
    Explain {
        code: i32,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match CpakConfig::load(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e:#}");
            return exit_status(ErrorCode::Unknown);
        }
    };
    let config_found = loaded.is_some();
    let config = loaded.unwrap_or_default();

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli
        .log_format
        .unwrap_or_else(|| parse_log_format(&config.log.format));
    init_logging(&level, format);
    debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "cpak starting"
    );
    if !config_found {
        warn!(config = %cli.config.display(), "config file not found, using defaults");
    }

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = error_code(&err);
            error!(code = code.as_i32(), "{err:#}");
            eprintln!("error: {err:#}");
            exit_status(code)
        }
    }
}

fn run(cli: &Cli, config: &CpakConfig) -> Result<()> {
    match &cli.command {
        Commands::Decrypt { input, output } => cmd_decrypt(cli, config, input, output),
        Commands::List { input } => cmd_list(cli, config, input),
        Commands::Extract { input, names, out } => {
            cmd_extract(cli, config, input, names, out.as_deref())
        }
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(config, &cli.config),
        Commands::Explain { code } => cmd_explain(*code),
    }
}

// ── Logging ───────────────────────────────────────────────────────────────────

fn parse_log_format(value: &str) -> LogFormat {
    if value.eq_ignore_ascii_case("json") {
        LogFormat::Json
    } else {
        LogFormat::Text
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Errors and exit status ────────────────────────────────────────────────────

/// The boundary code of the first `PakError` in the chain, else `Unknown`.
fn error_code(err: &anyhow::Error) -> ErrorCode {
    err.downcast_ref::<PakError>()
        .map(PakError::code)
        .unwrap_or(ErrorCode::Unknown)
}

fn exit_status(code: ErrorCode) -> ExitCode {
    ExitCode::from(code.as_i32() as u8)
}

// ── Key loading ───────────────────────────────────────────────────────────────

fn load_public_key(cli: &Cli, config: &CpakConfig) -> Result<Vec<u8>> {
    let path = cli
        .key
        .clone()
        .or_else(|| config.keys.public_key.clone())
        .ok_or_else(|| {
            PakError::ReadKey("no public key given; use --key or set keys.public_key".into())
        })?;

    let blob = std::fs::read(&path)
        .map_err(|e| PakError::ReadKey(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), bytes = blob.len(), "loaded public key");
    Ok(blob)
}

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ── `cpak decrypt` ────────────────────────────────────────────────────────────

fn cmd_decrypt(cli: &Cli, config: &CpakConfig, input: &Path, output: &Path) -> Result<()> {
    let key = load_public_key(cli, config)?;
    let options = DecryptOptions::from(&config.decrypt);

    let spinner = make_spinner("decrypt");
    spinner.set_message(input.display().to_string());

    let result = decrypt_archive_with(input, output, &key, &options);
    match &result {
        Ok(summary) => spinner.finish_with_message(format!(
            "{} entries, {} bytes -> {}",
            summary.entries,
            summary.bytes_written,
            output.display()
        )),
        Err(_) => spinner.finish_and_clear(),
    }

    result.with_context(|| format!("decrypting {}", input.display()))?;
    Ok(())
}

// ── `cpak list` ───────────────────────────────────────────────────────────────

fn cmd_list(cli: &Cli, config: &CpakConfig, input: &Path) -> Result<()> {
    let key = load_public_key(cli, config)?;
    let options = DecryptOptions::from(&config.decrypt);

    let names = list_entries_with(input, &key, &options)
        .with_context(|| format!("listing {}", input.display()))?;
    for name in names {
        println!("{name}");
    }
    Ok(())
}

// ── `cpak extract` ────────────────────────────────────────────────────────────

fn cmd_extract(
    cli: &Cli,
    config: &CpakConfig,
    input: &Path,
    names: &[String],
    out: Option<&Path>,
) -> Result<()> {
    let key = load_public_key(cli, config)?;
    let options = DecryptOptions::from(&config.decrypt);
    let out_dir = out.unwrap_or(&config.extract.output_dir);

    // Validate every destination before decrypting anything.
    let destinations = names
        .iter()
        .map(|name| entry_destination(out_dir, name))
        .collect::<Result<Vec<_>>>()?;

    let extracted = extract_entries_with(input, &key, names, &options)
        .with_context(|| format!("extracting from {}", input.display()))?;

    let mut missing = 0usize;
    for (name, dest) in names.iter().zip(&destinations) {
        let Some(bytes) = extracted.get(name) else {
            warn!(name = %name, "entry not in archive");
            missing += 1;
            continue;
        };
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(dest, bytes).with_context(|| format!("writing {}", dest.display()))?;
        println!("{}", dest.display());
    }

    info!(
        requested = names.len(),
        written = names.len() - missing,
        missing,
        "extract complete"
    );
    Ok(())
}

/// `out_dir/name`, refusing names that are absolute or climb out of `out_dir`.
fn entry_destination(out_dir: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || name.is_empty() {
        anyhow::bail!("refusing to extract {name:?}: path leaves the output directory");
    }
    Ok(out_dir.join(relative))
}

// ── `cpak config show` ────────────────────────────────────────────────────────

fn cmd_config_show(config: &CpakConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

// ── `cpak explain` ────────────────────────────────────────────────────────────

fn cmd_explain(code: i32) -> Result<()> {
    let known = ErrorCode::from_i32(code);
    if known.as_i32() == code {
        println!("{code}: {known}");
    } else {
        println!("{code}: unrecognised code ({known})");
    }
    Ok(())
}
