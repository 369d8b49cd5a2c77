//! sealshare: encrypt files for sharing and open shared files locally
//!
//! Commands:
//!   encrypt <file>          - encrypt and package a file for upload
//!   decrypt <envelope>      - decrypt a saved shared-file response
//!   protect-key <pem>       - protect a PKCS#8 private key with a master password
//!   hash <file>             - print the SHA-256 content hash
//!   verify <file> <hash>    - check a file against a published hash
//!   config show             - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use sealshare_client::{PlainFile, ShareEngine};
use sealshare_core::config::SealshareConfig;
use sealshare_core::{AccessAction, Recipient};
use sealshare_crypto::{PrivateKeyMaterial, RecipientPublicKey};

const PASSWORD_ENV: &str = "SEALSHARE_MASTER_PASSWORD";
const PASSWORD_ATTEMPTS: usize = 3;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sealshare",
    version,
    about = "End-to-end encrypted file sharing client",
    long_about = "sealshare: encrypt files before upload and decrypt shared files after download, \
                  without the server ever seeing plaintext"
)]
struct Cli {
    /// Path to sealshare.toml configuration file
    #[arg(long, short = 'c', env = "SEALSHARE_CONFIG", default_value = "sealshare.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "SEALSHARE_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "SEALSHARE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file and write the upload package next to it
    ///
    /// Writes `<name>.enc` (nonce + ciphertext) and `<name>.upload.json`
    /// (key material for the server, metadata, recipients).
    Encrypt {
        /// File to encrypt
        file: PathBuf,
        /// Uploader's RSA public key (SPKI PEM)
        #[arg(long)]
        owner_public_key: PathBuf,
        /// MIME type (default: guessed from the file extension)
        #[arg(long)]
        mime: Option<String>,
        /// Output directory (default: next to the input file)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Recipient email; repeat for several recipients
        #[arg(long = "recipient", short = 'r')]
        recipients: Vec<String>,
        /// Let recipients download as well as view
        #[arg(long)]
        allow_download: bool,
    },

    /// Decrypt a saved shared-file response body
    ///
    /// The master password is read from SEALSHARE_MASTER_PASSWORD or prompted for.
    Decrypt {
        /// Raw multipart response body
        envelope: PathBuf,
        /// The response's Content-Type header (carries the boundary)
        #[arg(long)]
        content_type: String,
        /// File holding the base64 master-key-protected private key
        #[arg(long)]
        private_key_blob: PathBuf,
        /// Access being requested
        #[arg(long, default_value = "view")]
        action: ActionArg,
        /// Output path (default: the shared file's name in the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Protect a PKCS#8 private key under a master password
    #[command(name = "protect-key")]
    ProtectKey {
        /// Private key (PKCS#8 PEM)
        pem: PathBuf,
        /// Write the base64 blob here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the SHA-256 content hash of a file
    Hash {
        file: PathBuf,
    },

    /// Check a file against a published SHA-256 hash
    Verify {
        file: PathBuf,
        hash: String,
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

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ActionArg {
    View,
    Download,
}

impl From<ActionArg> for AccessAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::View => AccessAction::View,
            ActionArg::Download => AccessAction::Download,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, from_file) = load_config(&cli.config).await?;

    let level = cli.log.clone().unwrap_or_else(|| config.logging.level.clone());
    let format = cli.log_format.unwrap_or(match config.logging.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, format);

    if !from_file {
        debug!("config file not found: {}  (using defaults)", cli.config.display());
    }

    match cli.command {
        Commands::Encrypt {
            file,
            owner_public_key,
            mime,
            out_dir,
            recipients,
            allow_download,
        } => {
            let recipients = recipients
                .into_iter()
                .map(|email| Recipient {
                    email,
                    can_view: true,
                    can_download: allow_download,
                })
                .collect();
            cmd_encrypt(
                &config,
                &file,
                &owner_public_key,
                mime.as_deref(),
                out_dir.as_deref(),
                recipients,
            )
            .await
        }
        Commands::Decrypt {
            envelope,
            content_type,
            private_key_blob,
            action,
            out,
        } => {
            cmd_decrypt(
                &config,
                &envelope,
                &content_type,
                &private_key_blob,
                action.into(),
                out.as_deref(),
            )
            .await
        }
        Commands::ProtectKey { pem, out } => cmd_protect_key(&config, &pem, out.as_deref()).await,
        Commands::Hash { file } => cmd_hash(&file).await,
        Commands::Verify { file, hash } => cmd_verify(&file, &hash).await,
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so stdout stays clean for hashes and key blobs
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

// ── Config loading ────────────────────────────────────────────────────────────

/// Load and validate the config; the flag reports whether a file was found.
async fn load_config(path: &Path) -> Result<(SealshareConfig, bool)> {
    if !path.exists() {
        return Ok((SealshareConfig::default(), false));
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config: {}", path.display()))?;
    let config = SealshareConfig::from_toml_str(&content)
        .with_context(|| format!("parsing config: {}", path.display()))?;
    Ok((config, true))
}

// ── Password and progress helpers ─────────────────────────────────────────────

/// Master password from the environment, or an interactive prompt.
///
/// Returns whether the value was prompted for, so callers know a retry is possible.
fn read_master_password(confirm: bool) -> Result<(SecretString, bool)> {
    if let Ok(value) = std::env::var(PASSWORD_ENV) {
        return Ok((SecretString::from(value), false));
    }

    let password = SecretString::from(
        rpassword::prompt_password("Master password: ").context("reading master password")?,
    );
    if confirm {
        let again = rpassword::prompt_password("Confirm master password: ")
            .context("reading master password")?;
        if again != password.expose_secret() {
            anyhow::bail!("passwords do not match");
        }
    }
    if password.expose_secret().is_empty() {
        anyhow::bail!("master password must not be empty");
    }
    Ok((password, true))
}

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// MIME type from a file extension, for the types viewers can render.
fn guess_mimetype(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Only the final component of a server-supplied name is trusted as a path.
fn safe_file_name(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("shared-file")
}

// ── `sealshare encrypt` ───────────────────────────────────────────────────────

async fn cmd_encrypt(
    config: &SealshareConfig,
    path: &Path,
    owner_public_key: &Path,
    mime: Option<&str>,
    out_dir: Option<&Path>,
    recipients: Vec<Recipient>,
) -> Result<()> {
    let engine = ShareEngine::new(config).context("building share engine")?;

    let pem = tokio::fs::read_to_string(owner_public_key)
        .await
        .with_context(|| format!("reading public key: {}", owner_public_key.display()))?;
    let owner = RecipientPublicKey::from_pem(&pem)
        .with_context(|| format!("parsing public key: {}", owner_public_key.display()))?;

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading file: {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("not a file name: {}", path.display()))?
        .to_string();
    let file = PlainFile {
        mimetype: mime.unwrap_or_else(|| guess_mimetype(path)).to_string(),
        name,
        bytes,
    };

    let pb = make_spinner("encrypt");
    pb.set_message(file.name.clone());
    let package = engine
        .seal_for_upload_async(file, owner, recipients)
        .await
        .context("encrypting file")?;
    pb.finish_and_clear();

    let dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let (blob_path, json_path) = output_paths(&dir, &package.metadata.name);

    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("creating output dir: {}", dir.display()))?;
    tokio::fs::write(&blob_path, package.encrypted_file.as_bytes())
        .await
        .with_context(|| format!("writing {}", blob_path.display()))?;
    let json = serde_json::to_string_pretty(&package).context("serializing upload package")?;
    tokio::fs::write(&json_path, json)
        .await
        .with_context(|| format!("writing {}", json_path.display()))?;

    info!(file = %package.metadata.name, out = %blob_path.display(), "upload package written");

    println!("Encrypted: {}", package.metadata.name);
    println!("  type:       {}", package.metadata.mimetype);
    println!("  size:       {}", fmt_bytes(package.metadata.size));
    println!("  sha256:     {}", package.metadata.hash);
    println!("  recipients: {}", package.recipients.len());
    println!("  blob:       {}", blob_path.display());
    println!("  package:    {}", json_path.display());
    Ok(())
}

fn output_paths(dir: &Path, name: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{name}.enc")),
        dir.join(format!("{name}.upload.json")),
    )
}

// ── `sealshare decrypt` ───────────────────────────────────────────────────────

async fn cmd_decrypt(
    config: &SealshareConfig,
    envelope_path: &Path,
    content_type: &str,
    private_key_blob: &Path,
    action: AccessAction,
    out: Option<&Path>,
) -> Result<()> {
    let engine = ShareEngine::new(config).context("building share engine")?;

    let raw = tokio::fs::read(envelope_path)
        .await
        .with_context(|| format!("reading envelope: {}", envelope_path.display()))?;
    let protected_key = tokio::fs::read_to_string(private_key_blob)
        .await
        .with_context(|| format!("reading private key blob: {}", private_key_blob.display()))?
        .trim()
        .to_string();

    let envelope = engine
        .open_response(&raw, content_type)
        .map_err(|e| user_facing(e, "decoding envelope"))?;
    println!(
        "Shared by {} (@{}): {} ({}, {})",
        envelope.metadata.owner.name,
        envelope.metadata.owner.username,
        envelope.metadata.name,
        envelope.metadata.mimetype,
        fmt_bytes(envelope.metadata.size),
    );

    let mut attempt = 0;
    let file = loop {
        attempt += 1;
        let (password, prompted) = read_master_password(false)?;

        let pb = make_spinner("decrypt");
        pb.set_message("deriving master key");
        let result = engine
            .decrypt_shared_async(
                envelope.clone(),
                protected_key.clone(),
                password,
                action,
                chrono::Utc::now(),
            )
            .await;
        pb.finish_and_clear();

        match result {
            Ok(file) => break file,
            Err(e) if prompted && e.is_retryable_with_new_input() && attempt < PASSWORD_ATTEMPTS => {
                eprintln!("{}", e.user_message());
            }
            Err(e) => return Err(user_facing(e, "decrypting shared file")),
        }
    };

    let out_path = match out {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(safe_file_name(&file.name)),
    };
    tokio::fs::write(&out_path, &file.bytes)
        .await
        .with_context(|| format!("writing {}", out_path.display()))?;

    println!();
    println!("Decrypted:");
    println!("  local:  {}", out_path.display());
    println!("  kind:   {:?}", file.kind);
    println!("  bytes:  {}", fmt_bytes(file.bytes.len() as u64));
    Ok(())
}

/// Log the detailed error, surface only the user-facing message.
fn user_facing(err: sealshare_core::ShareError, stage: &str) -> anyhow::Error {
    warn!(error = %err, "{stage} failed");
    anyhow::anyhow!("{}", err.user_message())
}

// ── `sealshare protect-key` ───────────────────────────────────────────────────

async fn cmd_protect_key(config: &SealshareConfig, pem_path: &Path, out: Option<&Path>) -> Result<()> {
    let engine = ShareEngine::new(config).context("building share engine")?;

    let pem = tokio::fs::read_to_string(pem_path)
        .await
        .with_context(|| format!("reading private key: {}", pem_path.display()))?;
    let private_key = PrivateKeyMaterial::from_pkcs8_pem(&pem)
        .with_context(|| format!("parsing PKCS#8 private key: {}", pem_path.display()))?;
    drop(pem);

    let (password, _) = read_master_password(true)?;

    let pb = make_spinner("protect");
    pb.set_message("deriving master key");
    let unwrapper = engine.unwrapper().clone();
    let protected = tokio::task::spawn_blocking(move || {
        unwrapper.protect_private_key(&private_key, &password)
    })
    .await
    .context("key protection task failed")?
    .context("protecting private key")?;
    pb.finish_and_clear();

    let encoded = protected.to_base64();
    match out {
        Some(path) => {
            tokio::fs::write(path, format!("{encoded}\n"))
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Protected key written to {}", path.display());
        }
        None => println!("{encoded}"),
    }
    Ok(())
}

// ── `sealshare hash` / `sealshare verify` ─────────────────────────────────────

async fn cmd_hash(path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading file: {}", path.display()))?;
    println!("{}  {}", sealshare_crypto::content_hash(&bytes), path.display());
    Ok(())
}

async fn cmd_verify(path: &Path, expected: &str) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading file: {}", path.display()))?;
    sealshare_crypto::ensure_integrity(&bytes, expected)
        .map_err(|e| user_facing(e, "verifying file"))?;
    println!("{}: OK", path.display());
    Ok(())
}

// ── `sealshare config show` ───────────────────────────────────────────────────

fn cmd_config_show(config: &SealshareConfig, config_path: &Path) -> Result<()> {
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
