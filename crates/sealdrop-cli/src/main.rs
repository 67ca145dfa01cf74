//! sealdrop: seal files with a passphrase and open them again
//!
//! Commands:
//!   seal <file>          - encrypt a file and store it, printing its id
//!   open <id>            - fetch a blob, decrypt it and write the file
//!   inspect <id>         - show the unencrypted blob header
//!   config show          - display current configuration
//!
//! The passphrase is prompted for on the terminal, or read from
//! SEALDROP_PASSPHRASE for scripted use.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use sealdrop_core::SealdropConfig;
use sealdrop_crypto::{BlobView, CryptoError};
use sealdrop_storage::{BlobId, BlobStore, OpendalBlobStore, StorageError};

const PASSPHRASE_ENV: &str = "SEALDROP_PASSPHRASE";
const FALLBACK_OUTPUT_NAME: &str = "sealdrop-download";

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sealdrop",
    version,
    about = "Passphrase-sealed file drops",
    long_about = "sealdrop: encrypt files with a passphrase into a shared blob store"
)]
struct Cli {
    /// Path to config.toml
    #[arg(
        long,
        short = 'c',
        env = "SEALDROP_CONFIG",
        default_value = "/etc/sealdrop/config.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a local file and store it
    Seal {
        /// File to seal
        file: PathBuf,
        /// Filename recorded in the blob (default: the file's own name)
        #[arg(long)]
        name: Option<String>,
        /// Media type recorded in the blob (default: guessed from the name)
        #[arg(long)]
        media_type: Option<String>,
    },

    /// Fetch and decrypt a stored file
    Open {
        /// Blob id printed by `seal`
        id: String,
        /// Where to write the file (default: the stored filename)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Overwrite the output file if it exists
        #[arg(long)]
        force: bool,
    },

    /// Show the unencrypted header of a stored blob
    Inspect {
        /// Blob id
        id: String,
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

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Seal {
            file,
            name,
            media_type,
        } => cmd_seal(&config, &file, name, media_type).await,
        Commands::Open { id, output, force } => {
            cmd_open(&config, &id, output.as_deref(), force).await
        }
        Commands::Inspect { id } => cmd_inspect(&config, &id).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config),
    }
}

/// Diagnostics go to stderr so they never mix with printed ids.
fn init_logging() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

// ── Config + storage ──────────────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<SealdropConfig> {
    SealdropConfig::load_or_default(path)
        .with_context(|| format!("loading config: {}", path.display()))
}

fn open_store(config: &SealdropConfig) -> Result<OpendalBlobStore> {
    let op = sealdrop_storage::build_operator(&config.storage, None)
        .context("building storage operator")?;
    Ok(OpendalBlobStore::new(op, &config.storage.prefix))
}

async fn fetch_blob(store: &OpendalBlobStore, id: &str) -> Result<(BlobId, Vec<u8>)> {
    let id = BlobId::parse(id).with_context(|| format!("'{id}' is not a sealdrop id"))?;
    match store.get(&id).await {
        Ok(blob) => Ok((id, blob)),
        Err(StorageError::NotFound(_)) => anyhow::bail!("no blob with id {id}"),
        Err(e) => Err(e).with_context(|| format!("fetching blob {id}")),
    }
}

// ── Passphrase + progress helpers ─────────────────────────────────────────────

/// Passphrase from SEALDROP_PASSPHRASE, else from the terminal. When
/// `confirm` is set the prompt is repeated and both entries must match.
fn read_passphrase(confirm: bool) -> Result<SecretString> {
    let from_env = std::env::var(PASSPHRASE_ENV).ok().map(SecretString::from);
    let passphrase = match from_env {
        Some(p) => p,
        None => {
            let first = SecretString::from(
                rpassword::prompt_password("Passphrase: ").context("reading passphrase")?,
            );
            if confirm {
                let second = SecretString::from(
                    rpassword::prompt_password("Repeat passphrase: ")
                        .context("reading passphrase")?,
                );
                if first.expose_secret() != second.expose_secret() {
                    anyhow::bail!("passphrases do not match");
                }
            }
            first
        }
    };
    check_passphrase(passphrase)
}

fn check_passphrase(passphrase: SecretString) -> Result<SecretString> {
    if passphrase.expose_secret().is_empty() {
        anyhow::bail!("passphrase must not be empty");
    }
    Ok(passphrase)
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

// ── `sealdrop seal` ───────────────────────────────────────────────────────────

async fn cmd_seal(
    config: &SealdropConfig,
    file: &Path,
    name: Option<String>,
    media_type: Option<String>,
) -> Result<()> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    if data.is_empty() {
        anyhow::bail!("{} is empty; there is nothing to seal", file.display());
    }

    let filename = name.unwrap_or_else(|| {
        file.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let media_type = media_type.unwrap_or_else(|| guess_media_type(&filename));

    let store = open_store(config)?;
    let passphrase = read_passphrase(true)?;
    let kdf = config.crypto.kdf_params();
    let size = data.len() as u64;

    let pb = make_spinner("seal");
    pb.set_message(format!("encrypting {filename}"));

    let name_for_seal = filename.clone();
    let type_for_seal = media_type.clone();
    let blob = tokio::task::spawn_blocking(move || {
        sealdrop_crypto::seal(&data, &name_for_seal, &type_for_seal, &passphrase, &kdf)
    })
    .await
    .context("seal task panicked")?
    .context("sealing file")?;

    pb.set_message("storing".to_string());
    let blob_len = blob.len() as u64;
    let id = store.put(blob).await.context("storing blob")?;
    pb.finish_and_clear();

    tracing::debug!(id = %id, bytes = size, "sealed");
    eprintln!("Sealed {} ({}, {})", filename, media_type, fmt_bytes(size));
    eprintln!("  blob:  {}", fmt_bytes(blob_len));
    println!("{id}");

    Ok(())
}

// ── `sealdrop open` ───────────────────────────────────────────────────────────

async fn cmd_open(
    config: &SealdropConfig,
    id: &str,
    output: Option<&Path>,
    force: bool,
) -> Result<()> {
    let store = open_store(config)?;
    let (id, blob) = fetch_blob(&store, id).await?;

    let passphrase = read_passphrase(false)?;
    let kdf = config.crypto.kdf_params();

    let pb = make_spinner("open");
    pb.set_message("decrypting".to_string());

    let result =
        tokio::task::spawn_blocking(move || sealdrop_crypto::open(&blob, &passphrase, &kdf))
            .await
            .context("open task panicked")?;
    pb.finish_and_clear();

    let opened = match result {
        Ok(file) => file,
        Err(e) if e.is_decryption_failure() => {
            anyhow::bail!("could not decrypt {id}: wrong passphrase or damaged blob")
        }
        Err(e) => return Err(e).context("opening blob"),
    };

    let out_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(output_name(&opened.filename)));
    if out_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            out_path.display()
        );
    }

    tokio::fs::write(&out_path, &opened.data)
        .await
        .with_context(|| format!("writing {}", out_path.display()))?;

    println!("Opened {} → {}", id, out_path.display());
    println!("  type:  {}", opened.media_type);
    println!("  bytes: {}", fmt_bytes(opened.data.len() as u64));

    Ok(())
}

// ── `sealdrop inspect` ────────────────────────────────────────────────────────

async fn cmd_inspect(config: &SealdropConfig, id: &str) -> Result<()> {
    let store = open_store(config)?;
    let (id, blob) = fetch_blob(&store, id).await?;

    let view = BlobView::parse(&blob)
        .map_err(|e: CryptoError| anyhow::anyhow!("blob {id} is malformed: {e}"))?;

    println!("id:          {id}");
    println!("filename:    {}", view.filename);
    println!("media type:  {}", view.media_type);
    println!("blob size:   {}", fmt_bytes(blob.len() as u64));
    println!("header:      {} B", view.header_len());
    println!("ciphertext:  {}", fmt_bytes(view.ciphertext.len() as u64));
    println!("salt:        {}", hex(&view.material.salt));
    println!("nonce:       {}", hex(&view.material.nonce));

    Ok(())
}

// ── `sealdrop config show` ────────────────────────────────────────────────────

fn cmd_config_show(config: &SealdropConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!(
            "# Configuration: defaults (no file at {})",
            config_path.display()
        );
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

// ── Utilities ─────────────────────────────────────────────────────────────────

fn guess_media_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Final component of a stored filename, so a crafted name cannot write
/// outside the current directory.
fn output_name(stored: &str) -> String {
    match stored.rsplit(['/', '\\']).next().unwrap_or("") {
        "" | "." | ".." => FALLBACK_OUTPUT_NAME.to_string(),
        name => name.to_string(),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
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
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_seal_args() {
        let cli = Cli::try_parse_from([
            "sealdrop",
            "seal",
            "notes.txt",
            "--name",
            "report.txt",
            "--media-type",
            "text/plain",
        ])
        .unwrap();
        match cli.command {
            Commands::Seal {
                file,
                name,
                media_type,
            } => {
                assert_eq!(file, PathBuf::from("notes.txt"));
                assert_eq!(name.as_deref(), Some("report.txt"));
                assert_eq!(media_type.as_deref(), Some("text/plain"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_output_name_strips_directories() {
        assert_eq!(output_name("note.txt"), "note.txt");
        assert_eq!(output_name("../../etc/passwd"), "passwd");
        assert_eq!(output_name("C:\\Users\\me\\photo.jpg"), "photo.jpg");
        assert_eq!(output_name("dir/"), FALLBACK_OUTPUT_NAME);
        assert_eq!(output_name(".."), FALLBACK_OUTPUT_NAME);
        assert_eq!(output_name(""), FALLBACK_OUTPUT_NAME);
    }

    #[test]
    fn test_guess_media_type() {
        assert_eq!(guess_media_type("a.txt"), "text/plain");
        assert_eq!(guess_media_type("a.png"), "image/png");
        assert_eq!(guess_media_type("no-extension"), "application/octet-stream");
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[0x00, 0x0f, 0xab, 0xff]), "000fabff");
        assert_eq!(hex(&[]), "");
    }

    #[test]
    fn test_fmt_bytes() {
        assert_eq!(fmt_bytes(0), "0 B");
        assert_eq!(fmt_bytes(1023), "1023 B");
        assert_eq!(fmt_bytes(1536), "1.5 KB");
        assert_eq!(fmt_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(fmt_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        assert!(check_passphrase(SecretString::from("")).is_err());
        assert!(check_passphrase(SecretString::from("pw")).is_ok());
    }

    #[test]
    fn test_load_config_missing_present_and_broken() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let defaults = load_config(&path).unwrap();
        assert_eq!(defaults.storage.prefix, "sealdrop");

        std::fs::write(&path, "[storage]\nbackend = \"memory\"\nprefix = \"drops\"\n").unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.storage.prefix, "drops");

        std::fs::write(&path, "[storage\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config error"));
    }

    #[tokio::test]
    async fn test_fetch_blob_errors() {
        let store = OpendalBlobStore::memory().unwrap();

        let bad = fetch_blob(&store, "not-an-id").await.unwrap_err();
        assert!(bad.to_string().contains("not a sealdrop id"));

        let missing = BlobId::new().to_string();
        let err = fetch_blob(&store, &missing).await.unwrap_err();
        assert!(err.to_string().contains("no blob with id"));

        let id = store.put(b"blob".to_vec()).await.unwrap();
        let (fetched, bytes) = fetch_blob(&store, &id.to_string()).await.unwrap();
        assert_eq!(fetched, id);
        assert_eq!(bytes, b"blob");
    }
}
