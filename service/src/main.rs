use std::{future::Future, path::PathBuf};

use alloy::primitives::{Address, TxHash, U256};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use geneforge::{
    coerce_args, report_transaction_error, CallRequest, ContractAddresses, ContractName,
    DeviceClass, Dispatcher, ErrorCategory, ErrorHandlerOptions, LocalWallet, RawError,
    RedbStorage, Registry, ResearchClient, RpcReadClient, TargetChain, Toast, Toaster,
    TransactionHistory, TransactionRecord, WorkflowStatus,
};

#[derive(Parser)]
#[command(name = "geneforge", about = "GENEForge genomic research records on Base Sepolia")]
struct Args {
    /// RPC endpoint of the target chain
    #[arg(long, env = "BASE_SEPOLIA_RPC_URL")]
    rpc_url: Option<String>,

    /// Key used by the local wallet; writes are refused without it
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Deployment output overriding the default contract addresses
    #[arg(
        long,
        env = "GENEFORGE_CONTRACT_ADDRESSES",
        default_value = "contract-addresses.json"
    )]
    addresses: PathBuf,

    /// Directory holding the transaction history
    #[arg(long, env = "GENEFORGE_DATA_DIR", default_value = ".geneforge")]
    data_dir: PathBuf,

    /// User agent used to word wallet guidance
    #[arg(long, env = "GENEFORGE_USER_AGENT", default_value = "")]
    user_agent: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the target chain and contract addresses
    Chain,
    /// Call a view function
    Read {
        contract: String,
        function: String,
        args: Vec<String>,
    },
    /// Submit a transaction to any registered contract function
    Write {
        contract: String,
        function: String,
        args: Vec<String>,
    },
    RegisterSample {
        sample_id: String,
        sample_type: String,
        description: String,
        importance: String,
    },
    Sample {
        sample_id: String,
    },
    /// List SAMPLE001..SAMPLEnnn
    Samples,
    RegisterExperiment {
        specimen_id: U256,
        location: String,
        notes: String,
    },
    Experiment {
        id: U256,
    },
    RegisterEvidence {
        specimen_id: U256,
        evidence_type: String,
        evidence_hash: String,
    },
    Evidence {
        id: U256,
    },
    /// Record counts per contract
    Counts,
    GrantAccess {
        role: String,
        account: Address,
    },
    UpdateStatus {
        sample_id: String,
        status: WorkflowStatus,
        notes: String,
    },
    RegisterIp {
        title: String,
        description: String,
        ip_type: String,
        /// Comma separated owner addresses
        owners: String,
        #[arg(long)]
        uri: Option<String>,
    },
    /// Show or clear recent transactions
    History {
        #[arg(long)]
        clear: bool,
    },
}

struct TerminalToaster;

impl Toaster for TerminalToaster {
    fn toast(&self, toast: Toast) {
        eprintln!("{}: {}", toast.title, toast.description);
    }
}

type Client = ResearchClient<RpcReadClient, LocalWallet>;

struct App {
    client: Client,
    history: TransactionHistory<RedbStorage>,
}

impl App {
    async fn submit(
        &self,
        title: &str,
        description: String,
        tx: impl Future<Output = geneforge::Result<TxHash>>,
    ) -> eyre::Result<()> {
        match tx.await {
            Ok(hash) => {
                println!("Transaction hash: {hash}");
                println!(
                    "{}",
                    self.client
                        .dispatcher()
                        .chain()
                        .explorer_tx_url(&hash.to_string())
                );
                if let Err(e) = self
                    .history
                    .record(TransactionRecord::now(hash.to_string(), description))
                {
                    tracing::warn!("Error saving transaction history: {}", e);
                }
                Ok(())
            }
            Err(e) => {
                let mut submitting = true;
                let classification = report_transaction_error(
                    &RawError::from(&e),
                    &ErrorHandlerOptions {
                        default_title: title,
                        toaster: Some(&TerminalToaster),
                    },
                    Some(&mut submitting),
                );
                match classification {
                    Some(c) if c.category == ErrorCategory::UserRejected => Ok(()),
                    _ => Err(e.into()),
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let chain = TargetChain::base_sepolia().with_rpc_override(args.rpc_url.clone());
    let registry = Registry::new(ContractAddresses::load_or_default(&args.addresses))?;
    let reader = RpcReadClient::new(&chain)?;
    let wallet = args
        .private_key
        .as_deref()
        .map(|key| LocalWallet::from_private_key(key, chain.chain_id, chain.rpc_url.clone()))
        .transpose()?;

    let dispatcher = Dispatcher::new(registry, chain, reader, wallet)
        .with_device(DeviceClass::from_user_agent(&args.user_agent));
    let app = App {
        client: ResearchClient::new(dispatcher),
        history: TransactionHistory::new(RedbStorage::in_dir(&args.data_dir)?),
    };

    run(&app, args.command).await
}

async fn run(app: &App, command: Command) -> eyre::Result<()> {
    let client = &app.client;
    let dispatcher = client.dispatcher();

    match command {
        Command::Chain => {
            let chain = dispatcher.chain();
            println!("{} (chain id {})", chain.name, chain.chain_id);
            println!("rpc: {}", chain.rpc_url);
            println!("explorer: {}", chain.block_explorer_url);
            for name in ContractName::ALL {
                let placeholder = if dispatcher.registry().is_placeholder_address(name) {
                    " (placeholder)"
                } else {
                    ""
                };
                println!(
                    "{}: {}{}",
                    name,
                    dispatcher.registry().addresses().get(name),
                    placeholder
                );
            }
        }
        Command::Read {
            contract,
            function,
            args,
        } => {
            let descriptor = dispatcher.registry().resolve(&contract)?;
            let values = coerce_args(&descriptor, &function, &args)?;
            let request = CallRequest::new(contract, function, values);
            for value in dispatcher.read_request(request).await? {
                println!("{value:?}");
            }
        }
        Command::Write {
            contract,
            function,
            args,
        } => {
            let descriptor = dispatcher.registry().resolve(&contract)?;
            let values = coerce_args(&descriptor, &function, &args)?;
            let description = format!("Called {contract}.{function}");
            let request = CallRequest::new(contract, function, values);
            app.submit(
                "Transaction Failed",
                description,
                dispatcher.write_request(request),
            )
            .await?;
        }
        Command::RegisterSample {
            sample_id,
            sample_type,
            description,
            importance,
        } => {
            app.submit(
                "Registration Failed",
                format!("Registered Genomic Sample: {sample_id}"),
                client.register_genome_sample(&sample_id, &sample_type, &description, &importance),
            )
            .await?;
        }
        Command::Sample { sample_id } => {
            println!("{:#?}", client.get_genome_sample(&sample_id).await?);
        }
        Command::Samples => {
            let samples = client.load_samples().await?;
            if samples.is_empty() {
                println!("No samples registered");
            }
            for sample in samples {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    sample.sample_id,
                    sample.sample_type,
                    sample.hazard_level,
                    sample.registered_by,
                    sample.description
                );
            }
        }
        Command::RegisterExperiment {
            specimen_id,
            location,
            notes,
        } => {
            app.submit(
                "Experiment Registration Failed",
                format!("Registered CRISPR Experiment for specimen {specimen_id}"),
                client.register_experiment(specimen_id, &location, &notes),
            )
            .await?;
        }
        Command::Experiment { id } => {
            println!("{:#?}", client.get_experiment(id).await?);
        }
        Command::RegisterEvidence {
            specimen_id,
            evidence_type,
            evidence_hash,
        } => {
            app.submit(
                "Evidence Registration Failed",
                format!("Registered {evidence_type} evidence for specimen {specimen_id}"),
                client.register_research_evidence(specimen_id, &evidence_type, &evidence_hash),
            )
            .await?;
        }
        Command::Evidence { id } => {
            println!("{:#?}", client.get_research_evidence(id).await?);
        }
        Command::Counts => {
            println!("samples: {}", client.get_genome_sample_count().await?);
            println!("experiments: {}", client.get_experiment_count().await?);
            println!("evidence: {}", client.get_research_evidence_count().await?);
        }
        Command::GrantAccess { role, account } => {
            let short = account.to_string();
            app.submit(
                "Access Grant Failed",
                format!("Granted {role} Access to {}...", &short[..6]),
                client.grant_researcher_access(&role, account),
            )
            .await?;
        }
        Command::UpdateStatus {
            sample_id,
            status,
            notes,
        } => {
            app.submit(
                "Status Update Failed",
                format!("Updated {sample_id} to {status}"),
                client.update_sample_status(&sample_id, status, &notes),
            )
            .await?;
        }
        Command::RegisterIp {
            title,
            description,
            ip_type,
            owners,
            uri,
        } => {
            app.submit(
                "IP Registration Failed",
                format!("Registered IP: {title}"),
                client.register_ip(&title, &description, &ip_type, uri.as_deref(), &owners),
            )
            .await?;
        }
        Command::History { clear } => {
            if clear {
                app.history.clear()?;
                println!("Transaction history cleared");
                return Ok(());
            }
            for record in app.history.load() {
                println!(
                    "{}\t{}\t{}",
                    record.timestamp, record.hash, record.description
                );
            }
        }
    }

    Ok(())
}
