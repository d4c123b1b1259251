//! sesame: master-password envelope CLI
//!
//! Commands:
//!   init [--payload FILE]   - create a new KGK and seal it under a new master password
//!   open [--output FILE]    - decrypt the envelope and write the payload
//!   update --payload FILE   - replace the payload, keeping the KGK
//!   passwd                  - change the master password (re-wraps the KGK only)
//!   info                    - show envelope format and sizes without decrypting
//!   presets [NAME]          - list password presets or show one preset's templates
//!   config show             - display the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use sesame_core::config::{EnvelopeFormat, LogFormat, SesameConfig};
use sesame_core::presets;
use sesame_core::{EnvelopeStore, FileStore};
use sesame_crypto::{aead, Compression, EnvelopeError, FormatVersion, Kgk, Opened};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sesame",
    version,
    about = "Master-password envelope for the sesame key generation key",
    long_about = "sesame: create, open, and re-key the encrypted envelope that protects the KGK"
)]
struct Cli {
    /// Path to sesame.toml configuration file
    #[arg(long, short = 'c', env = "SESAME_CONFIG", default_value = "~/.config/sesame/sesame.toml")]
    config: PathBuf,

    /// Envelope file (overrides sync.sync_file from the config)
    #[arg(long, short = 'f', env = "SESAME_FILE")]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new identity: fresh KGK, new master password, new envelope
    Init {
        /// File whose contents become the initial payload (default: empty)
        #[arg(long, short = 'p')]
        payload: Option<PathBuf>,
        /// Overwrite an existing envelope
        #[arg(long)]
        force: bool,
    },

    /// Decrypt the envelope and write the payload
    Open {
        /// Destination file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Replace the payload, keeping the KGK and master password
    Update {
        /// File whose contents become the new payload
        #[arg(long, short = 'p')]
        payload: PathBuf,
    },

    /// Change the master password without re-encrypting the payload
    Passwd,

    /// Show envelope format and sizes without decrypting
    Info,

    /// List password presets, or show the templates of one preset
    Presets {
        /// Preset name, e.g. "Medium security (12 chars)"
        name: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = sesame_core::config::expand_tilde(&cli.config);
    let config = SesameConfig::load(&config_path).context("loading configuration")?;
    init_logging(&config.logging.level, config.logging.format);

    match cli.command {
        Commands::Init { payload, force } => {
            cmd_init(&config, cli.file.as_deref(), payload.as_deref(), force)
        }
        Commands::Open { output } => cmd_open(&config, cli.file.as_deref(), output.as_deref()),
        Commands::Update { payload } => cmd_update(&config, cli.file.as_deref(), &payload),
        Commands::Passwd => cmd_passwd(&config, cli.file.as_deref()),
        Commands::Info => cmd_info(&config, cli.file.as_deref()),
        Commands::Presets { name } => cmd_presets(name.as_deref()),
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
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

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Resolve the envelope store: CLI flag > config sync file
fn resolve_store(config: &SesameConfig, override_path: Option<&Path>) -> Result<FileStore> {
    if let Some(p) = override_path {
        return Ok(FileStore::new(sesame_core::config::expand_tilde(p)));
    }
    if !config.sync.use_sync_file {
        anyhow::bail!("no envelope location: pass --file or set sync.use_sync_file = true");
    }
    Ok(FileStore::new(config.sync_file()))
}

fn load_envelope(store: &FileStore) -> Result<Vec<u8>> {
    store
        .load()
        .with_context(|| format!("reading envelope from {}", store.describe()))?
        .with_context(|| format!("no envelope at {} (run `sesame init` first)", store.describe()))
}

fn format_version(config: &SesameConfig) -> FormatVersion {
    match config.envelope.format {
        EnvelopeFormat::LegacyCbc => FormatVersion::LegacyCbc,
        EnvelopeFormat::Aead => FormatVersion::Aead,
    }
}

fn compression(config: &SesameConfig) -> Compression {
    Compression::from_level(config.envelope.compression_level)
}

/// Read a password from `env_var` if set, otherwise prompt on the terminal.
fn read_password(prompt: &str, env_var: &str) -> Result<SecretString> {
    if let Ok(value) = std::env::var(env_var) {
        return Ok(SecretString::from(value));
    }
    let value = rpassword::prompt_password(prompt).context("reading password")?;
    Ok(SecretString::from(value))
}

fn read_new_password() -> Result<SecretString> {
    let first = read_password("New master password: ", "SESAME_NEW_PASSWORD")?;
    if first.expose_secret().is_empty() {
        anyhow::bail!("master password must not be empty");
    }
    if std::env::var("SESAME_NEW_PASSWORD").is_err() {
        let second = Zeroizing::new(
            rpassword::prompt_password("Repeat master password: ").context("reading password")?,
        );
        if first.expose_secret() != second.as_str() {
            anyhow::bail!("passwords do not match");
        }
    }
    Ok(first)
}

/// Open with the configured compression. Every failure to open collapses into
/// one message so the CLI reveals nothing about why.
fn open_envelope(config: &SesameConfig, password: &SecretString, envelope: &[u8]) -> Result<Opened> {
    sesame_crypto::open(password, envelope, compression(config).is_enabled()).map_err(|e| {
        if e.is_open_failure() {
            tracing::debug!("open failed: {e}");
            anyhow::anyhow!(EnvelopeError::PaddingInvalid)
        } else {
            anyhow::anyhow!(e)
        }
    })
}

fn read_payload(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(p) => std::fs::read(p).with_context(|| format!("reading payload: {}", p.display())),
        None => Ok(Vec::new()),
    }
}

/// Write `data` to `path`, creating the file owner-only (0600 on Unix).
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // An existing file keeps its old mode; tighten it before writing.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(data)?;
    file.flush()
}

/// Format 0x01 without compression cannot tell most wrong passwords from
/// right ones; anything re-sealed after such an open may carry a garbage KGK.
fn warn_if_unverifiable(config: &SesameConfig, format: FormatVersion) {
    if format == FormatVersion::LegacyCbc && !compression(config).is_enabled() {
        tracing::warn!(
            "format 0x01 envelope without compression: a wrong password may go undetected"
        );
    }
}

// ── `sesame init` ─────────────────────────────────────────────────────────────

fn cmd_init(
    config: &SesameConfig,
    file: Option<&Path>,
    payload: Option<&Path>,
    force: bool,
) -> Result<()> {
    let store = resolve_store(config, file)?;
    if !force && store.load()?.is_some() {
        anyhow::bail!(
            "envelope already exists at {} (use --force to replace it)",
            store.describe()
        );
    }

    let payload = Zeroizing::new(read_payload(payload)?);
    let password = read_new_password()?;
    let kgk = Kgk::generate(&mut OsRng).context("generating KGK")?;

    let envelope = sesame_crypto::seal(
        &password,
        &kgk,
        &payload,
        format_version(config),
        compression(config),
        &mut OsRng,
    )
    .context("sealing envelope")?;
    store.save(&envelope).context("saving envelope")?;

    println!(
        "created envelope at {} (format 0x{:02x}, {} bytes)",
        store.describe(),
        envelope[0],
        envelope.len()
    );
    Ok(())
}

// ── `sesame open` ─────────────────────────────────────────────────────────────

fn cmd_open(config: &SesameConfig, file: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let store = resolve_store(config, file)?;
    let envelope = load_envelope(&store)?;
    let password = read_password("Master password: ", "SESAME_PASSWORD")?;

    let opened = open_envelope(config, &password, &envelope)?;

    match output {
        Some(path) => {
            write_private(path, &opened.payload)
                .with_context(|| format!("writing payload: {}", path.display()))?;
            eprintln!("payload written to {} ({} bytes)", path.display(), opened.payload.len());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&opened.payload).context("writing payload to stdout")?;
            stdout.flush()?;
        }
    }
    Ok(())
}

// ── `sesame update` ───────────────────────────────────────────────────────────

fn cmd_update(config: &SesameConfig, file: Option<&Path>, payload: &Path) -> Result<()> {
    let store = resolve_store(config, file)?;
    let envelope = load_envelope(&store)?;
    let password = read_password("Master password: ", "SESAME_PASSWORD")?;

    let opened = open_envelope(config, &password, &envelope)?;
    warn_if_unverifiable(config, opened.format);
    let new_payload = Zeroizing::new(read_payload(Some(payload))?);

    // Keep the format the envelope already has.
    let updated = sesame_crypto::seal(
        &password,
        &opened.kgk,
        &new_payload,
        opened.format,
        compression(config),
        &mut OsRng,
    )
    .context("sealing envelope")?;
    store.save(&updated).context("saving envelope")?;

    println!("payload updated ({} bytes)", new_payload.len());
    Ok(())
}

// ── `sesame passwd` ───────────────────────────────────────────────────────────

fn cmd_passwd(config: &SesameConfig, file: Option<&Path>) -> Result<()> {
    let store = resolve_store(config, file)?;
    let envelope = load_envelope(&store)?;
    let old_password = read_password("Current master password: ", "SESAME_PASSWORD")?;
    let new_password = read_new_password()?;

    if let Ok(format) = FormatVersion::of(&envelope) {
        warn_if_unverifiable(config, format);
    }
    let uncompress = compression(config).is_enabled();
    let rewrapped = sesame_crypto::rewrap(&old_password, &new_password, &envelope, uncompress, &mut OsRng)
        .map_err(|e| {
            if e.is_open_failure() {
                anyhow::anyhow!(EnvelopeError::PaddingInvalid)
            } else {
                anyhow::anyhow!(e)
            }
        })?;
    store.save(&rewrapped).context("saving envelope")?;

    println!("master password changed");
    Ok(())
}

// ── `sesame info` ─────────────────────────────────────────────────────────────

fn cmd_info(config: &SesameConfig, file: Option<&Path>) -> Result<()> {
    let store = resolve_store(config, file)?;
    let envelope = load_envelope(&store)?;
    let format = FormatVersion::of(&envelope)?;

    let (header, description) = match format {
        FormatVersion::LegacyCbc => (sesame_crypto::HEADER_SIZE, "AES-256-CBC, no integrity tag"),
        FormatVersion::Aead => (aead::AEAD_HEADER_SIZE, "AES-256-GCM"),
    };

    println!("location:      {}", store.describe());
    println!("format:        0x{:02x} ({description})", format.flag());
    println!("envelope size: {} bytes", envelope.len());
    println!("header size:   {header} bytes");
    println!("payload block: {} bytes", envelope.len().saturating_sub(header));
    Ok(())
}

// ── `sesame presets` ──────────────────────────────────────────────────────────

fn cmd_presets(name: Option<&str>) -> Result<()> {
    match name {
        None => {
            for preset in presets::PRESETS {
                println!(
                    "{:<45} {:>2} chars, {} template(s)",
                    preset.name,
                    preset.password_len(),
                    preset.templates.len()
                );
            }
        }
        Some(name) => {
            let preset = presets::preset_for(name)
                .with_context(|| format!("unknown preset: {name}"))?;
            println!("{} (randomizable: {})", preset.name, preset.randomizable);
            for template in preset.templates {
                println!("  {template}");
            }
        }
    }
    Ok(())
}

// ── `sesame config show` ──────────────────────────────────────────────────────

fn cmd_config_show(config: &SesameConfig, config_path: &Path) -> Result<()> {
    println!("# config: {}", config_path.display());
    let rendered = toml::to_string_pretty(config).context("rendering config")?;
    print!("{rendered}");
    Ok(())
}
