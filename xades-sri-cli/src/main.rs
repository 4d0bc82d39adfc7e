use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use xades_sri_core::{DocumentSigner, SignerConfig, canonical_document_digest};

#[derive(Parser)]
#[command(name = "xades-sri")]
#[command(about = "XAdES-BES signer for SRI electronic vouchers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a voucher with a PKCS#12 credential.
    Sign {
        #[arg(long)]
        credential: PathBuf,
        #[arg(long, env = "XADES_SRI_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        document: PathBuf,
        /// Write the signed voucher here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Keep the XML declaration on the same line as the root element.
        #[arg(long)]
        no_declaration_break: bool,
    },
    /// Print the digest of the canonicalized voucher.
    Digest {
        #[arg(long)]
        document: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_document(path: &PathBuf) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read document {}", path.display()))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sign {
            credential,
            password,
            document,
            output,
            no_declaration_break,
        } => {
            let credential_bytes = std::fs::read(&credential)
                .with_context(|| format!("failed to read credential {}", credential.display()))?;
            let xml = read_document(&document)?;
            let config = SignerConfig::default().with_declaration_line_break(!no_declaration_break);

            let signer = DocumentSigner::from_pkcs12(&credential_bytes, &password, config)
                .context("failed to load signing credential")?;
            let signed = signer.sign(&xml).context("failed to sign document")?;

            match output {
                Some(path) => std::fs::write(&path, signed.as_bytes())
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => std::io::stdout()
                    .write_all(signed.as_bytes())
                    .context("failed to write signed document")?,
            }
        }
        Commands::Digest { document } => {
            let xml = read_document(&document)?;
            println!("{}", canonical_document_digest(&xml));
        }
    }

    Ok(())
}
