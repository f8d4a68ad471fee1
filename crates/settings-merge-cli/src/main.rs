//! `settings-merge` CLI — merge JSON settings documents and manage per-project
//! secrets from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Merge new content (stdin) into an existing settings file, print to stdout
//! echo '{"Feature":{"Enabled":true}}' | settings-merge merge --original appsettings.json
//!
//! # Merge from file to file
//! settings-merge merge --original appsettings.json -i generated.json -o appsettings.json
//!
//! # Where are the secrets for a project?
//! settings-merge secrets path --id my-app-20240101
//!
//! # Merge arbitrary JSON into a project's secrets.json
//! settings-merge secrets merge --id my-app-20240101 -i extra.json
//!
//! # Record client credentials, moving secrets from an older id
//! settings-merge secrets set-identity --id new-id --previous-id old-id \
//!     --client-id 0000-1111 --client-secret s3cret
//!
//! # Record the application id, master key, and RSA key pair
//! settings-merge secrets set-application --id my-app-20240101 --master-key 8A1F00C3 \
//!     --public-key-file public.xml --private-key-file private.xml
//! ```
//!
//! Logging goes to stderr; `-v` raises the level, `RUST_LOG` overrides it.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use settings_merge::{AppSecrets, RsaKeys, SecretsStore};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "settings-merge",
    version,
    about = "Merge JSON settings documents and manage per-project secrets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root directory for per-project secrets (defaults to the user-secrets location)
    #[arg(long, global = true, env = "SETTINGS_MERGE_SECRETS_ROOT")]
    secrets_root: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge new JSON content into an existing JSON document
    Merge {
        /// The existing document (trailing commas tolerated)
        #[arg(long)]
        original: String,
        /// New content to merge in (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Emit single-line JSON instead of indented JSON
        #[arg(long)]
        compact: bool,
    },
    /// Inspect and update per-project secrets
    #[command(subcommand)]
    Secrets(SecretsCommand),
}

#[derive(Subcommand)]
enum SecretsCommand {
    /// Print the path of a project's secrets.json
    Path(IdArg),
    /// Print a project's secrets document
    Show(IdArg),
    /// Print the identity client id recorded for a project
    Identity(IdArg),
    /// Merge JSON content into a project's secrets
    Merge {
        #[command(flatten)]
        target: Target,
        /// Content to merge in (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Record identity client credentials in a project's secrets
    SetIdentity {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        client_id: String,
        #[arg(long)]
        client_secret: Option<String>,
    },
    /// Record the application id, master key, and RSA keys in a project's secrets
    SetApplication {
        #[command(flatten)]
        target: Target,
        /// Application id to record (defaults to --id)
        #[arg(long)]
        app_id: Option<String>,
        #[arg(long)]
        master_key: Option<String>,
        /// File holding the public key text
        #[arg(long, requires = "private_key_file")]
        public_key_file: Option<PathBuf>,
        /// File holding the private key text
        #[arg(long, requires = "public_key_file")]
        private_key_file: Option<PathBuf>,
    },
}

#[derive(Args)]
struct IdArg {
    /// Secrets id of the project
    #[arg(long)]
    id: String,
}

#[derive(Args)]
struct Target {
    /// Secrets id to write to
    #[arg(long)]
    id: String,
    /// Existing secrets id to merge from and move (defaults to --id)
    #[arg(long)]
    previous_id: Option<String>,
}

impl Target {
    fn previous(&self) -> &str {
        self.previous_id.as_deref().unwrap_or(&self.id)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Merge {
            original,
            input,
            output,
            compact,
        } => {
            let original_text = std::fs::read_to_string(&original)
                .with_context(|| format!("Failed to read file: {}", original))?;
            let incoming_text = read_input(input.as_deref())?;

            let merged = if compact {
                let original_value = settings_merge::parse_lenient(&original_text)
                    .context("Failed to parse original document")?;
                let incoming_value =
                    settings_merge::parse(&incoming_text).context("Failed to parse new content")?;
                let merged = settings_merge::merge(&original_value, &incoming_value)
                    .context("Failed to merge documents")?;
                settings_merge::serialize_compact(&merged)?
            } else {
                settings_merge::merge_documents(&original_text, &incoming_text)
                    .context("Failed to merge documents")?
            };

            write_output(output.as_deref(), &merged)?;
        }
        Commands::Secrets(command) => {
            let store = open_store(cli.secrets_root)?;
            run_secrets(&store, command)?;
        }
    }

    Ok(())
}

fn run_secrets(store: &SecretsStore, command: SecretsCommand) -> Result<()> {
    match command {
        SecretsCommand::Path(IdArg { id }) => {
            println!("{}", store.secrets_file(&id)?.display());
        }
        SecretsCommand::Show(IdArg { id }) => {
            let value = store
                .load(&id)
                .with_context(|| format!("Failed to load secrets for {}", id))?
                .with_context(|| format!("No secrets found for {}", id))?;
            println!("{}", settings_merge::serialize(&value)?);
        }
        SecretsCommand::Identity(IdArg { id }) => {
            let secrets = store
                .load_app_secrets(&id)
                .with_context(|| format!("Failed to load secrets for {}", id))?
                .with_context(|| format!("No secrets found for {}", id))?;
            match secrets.client_id() {
                Some(client_id) => println!("{}", client_id),
                None => anyhow::bail!("No identity client id recorded for {}", id),
            }
        }
        SecretsCommand::Merge { target, input } => {
            let content = read_input(input.as_deref())?;
            let location = store
                .write(&target.id, Some(target.previous()), &content)
                .with_context(|| format!("Failed to write secrets for {}", target.id))?;
            println!("{}", location.file.display());
        }
        SecretsCommand::SetIdentity {
            target,
            client_id,
            client_secret,
        } => {
            let content = AppSecrets::identity(client_id, client_secret).to_json()?;
            let location = store
                .write(&target.id, Some(target.previous()), &content)
                .with_context(|| format!("Failed to write secrets for {}", target.id))?;
            println!("{}", location.file.display());
        }
        SecretsCommand::SetApplication {
            target,
            app_id,
            master_key,
            public_key_file,
            private_key_file,
        } => {
            let rsa_keys = match (public_key_file, private_key_file) {
                (Some(public), Some(private)) => Some(RsaKeys {
                    public_key: Some(read_key(&public)?),
                    private_key: Some(read_key(&private)?),
                }),
                _ => None,
            };
            let app_id = app_id.unwrap_or_else(|| target.id.clone());
            let content = AppSecrets::application(app_id, master_key, rsa_keys).to_json()?;
            let location = store
                .write(&target.id, Some(target.previous()), &content)
                .with_context(|| format!("Failed to write secrets for {}", target.id))?;
            println!("{}", location.file.display());
        }
    }
    Ok(())
}

fn open_store(root: Option<PathBuf>) -> Result<SecretsStore> {
    match root {
        Some(root) => {
            debug!(root = %root.display(), "using explicit secrets root");
            Ok(SecretsStore::new(root))
        }
        None => SecretsStore::from_env().context("Failed to locate the user secrets directory"),
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn read_key(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(text.trim_end().to_owned())
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
