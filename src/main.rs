use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use txsign::{
    batch::{run_batch, run_single},
    config::Config,
    keyring::LocalKeyring,
    sequence::RpcAccountRetriever,
    SignOptions,
};

/// Sign transactions generated offline
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign a single transaction document and print its JSON encoding
    Sign {
        /// Transaction file, or `-` for stdin
        file: String,

        /// Print only the generated signature
        #[arg(long = "signature-only")]
        signature_only: bool,

        /// Replace an existing signature of the same key instead of appending
        #[arg(long)]
        overwrite: bool,

        #[command(flatten)]
        flags: SignFlags,
    },
    /// Sign a file of transactions, one per line, printing one result per line
    SignBatch {
        /// Transaction file, or `-` for stdin
        file: String,

        /// Print only the generated signatures
        #[arg(
            long = "signature-only",
            default_value_t = true,
            action = clap::ArgAction::Set
        )]
        signature_only: bool,

        /// Replace an existing signature of the same key; `false` appends
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        overwrite: bool,

        #[command(flatten)]
        flags: SignFlags,
    },
}

#[derive(Debug, Args)]
struct SignFlags {
    /// Name or address of the signing key
    #[arg(long)]
    from: String,

    /// Name or address of the multisig key signed on behalf of; implies --signature-only
    #[arg(long)]
    multisig: Option<String>,

    /// Do not query the node; requires --account-number and --sequence unless --multisig is set
    #[arg(long)]
    offline: bool,

    #[arg(long = "account-number")]
    account_number: Option<u64>,

    /// Sequence of the first transaction
    #[arg(long)]
    sequence: Option<u64>,

    /// Write output to this file instead of stdout
    #[arg(long = "output-document")]
    output_document: Option<PathBuf>,

    /// Overrides the chain id of the configuration file
    #[arg(long = "chain-id")]
    chain_id: Option<String>,
}

impl SignFlags {
    /// Build the run options; `signature_only` and `overwrite` default
    /// differently per subcommand so they are passed in
    fn into_options(self, signature_only: bool, overwrite: bool, config: &Config) -> SignOptions {
        SignOptions {
            from: self.from,
            multisig: self.multisig,
            offline: self.offline,
            signature_only,
            overwrite,
            account_number: self.account_number,
            sequence: self.sequence,
            output_document: self.output_document,
            chain_id: self.chain_id.unwrap_or_else(|| config.node.chain_id.clone()),
        }
    }
}

/// Entry point of the `txsign` binary.
///
/// Logs go to stderr; stdout only ever carries signing output.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    info!("txsign starting with config: {:?}", config);

    let keyring = LocalKeyring::from_config(&config.keyring)?;
    let retriever = RpcAccountRetriever::new(&config.node.rpc_url)?;

    match cli.command {
        Command::Sign {
            file,
            signature_only,
            overwrite,
            flags,
        } => {
            let opts = flags.into_options(signature_only, overwrite, &config);
            run_single(&opts, &keyring, &retriever, &file).await?;
        }
        Command::SignBatch {
            file,
            signature_only,
            overwrite,
            flags,
        } => {
            let opts = flags.into_options(signature_only, overwrite, &config);
            run_batch(&opts, &keyring, &retriever, &file).await?;
        }
    }

    Ok(())
}
