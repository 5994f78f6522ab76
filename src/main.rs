// ledger-node - Interactive ledger node
//
// Starts a node on the given port, dials any `--connect` peers, then serves
// a numbered menu on stdin until the user exits.

use clap::Parser;
use ledgermesh::node::{Node, NodeConfig};
use ledgermesh::transport::TcpTransportConfig;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ledger-node", about = "Peer-to-peer transaction ledger node")]
struct Cli {
    /// Port to listen on; also selects which ledger is loaded
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Directory holding the ledger
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Peer to dial at startup (repeatable)
    #[arg(long = "connect", value_name = "HOST:PORT")]
    connect: Vec<String>,

    /// Close a connection that sends nothing for this long
    #[arg(long)]
    read_timeout_secs: Option<u64>,

    /// Log filter, e.g. `debug` or `ledgermesh=trace` (defaults to RUST_LOG, then `info`)
    #[arg(long)]
    log: Option<String>,
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    let transport = TcpTransportConfig::new()
        .with_bind_address(&cli.host)
        .with_bind_port(cli.port)
        .with_read_timeout(cli.read_timeout_secs);
    let config = NodeConfig::new()
        .with_transport(transport)
        .with_data_dir(cli.data_dir);

    let node = match Node::open(config) {
        Ok(node) => node,
        Err(e) => {
            error!(error = %e, "failed to start node");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = node.listen().await {
        error!(error = %e, "failed to start listening");
        return ExitCode::FAILURE;
    }

    for peer in &cli.connect {
        match parse_peer(peer) {
            Some((host, port)) => {
                if let Err(e) = node.connect(host, port).await {
                    error!(%peer, error = %e, "could not connect to peer");
                }
            }
            None => error!(%peer, "expected HOST:PORT"),
        }
    }

    run_prompt(&node).await;

    if !node.shutdown().await {
        info!("exiting with connections still open");
    }
    ExitCode::SUCCESS
}

fn parse_peer(peer: &str) -> Option<(&str, u16)> {
    let (host, port) = peer.rsplit_once(':')?;
    Some((host, port.parse().ok()?))
}

// ============================================================================
// PROMPT
// ============================================================================

struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Print `question` and read one trimmed line; `None` on end of input
    async fn ask(&mut self, question: &str) -> Option<String> {
        print!("{question}");
        std::io::stdout().flush().ok();

        match self.lines.next_line().await {
            Ok(Some(line)) => Some(line.trim().to_string()),
            Ok(None) => None,
            Err(e) => {
                error!(error = %e, "failed to read from stdin");
                None
            }
        }
    }
}

async fn run_prompt(node: &Node) {
    let mut prompt = Prompt::new();

    loop {
        println!();
        println!("1. Connect to peer");
        println!("2. Create transaction");
        println!("3. View transactions");
        println!("4. Show wallet address");
        println!("5. Exit");

        let Some(choice) = prompt.ask("Choose an option: ").await else {
            break;
        };

        let keep_going = match choice.as_str() {
            "1" => connect_to_peer(node, &mut prompt).await,
            "2" => create_transaction(node, &mut prompt).await,
            "3" => {
                list_transactions(node);
                true
            }
            "4" => {
                println!("Wallet address: {}", node.wallet_address());
                true
            }
            "5" => false,
            _ => {
                println!("Invalid option, try again.");
                true
            }
        };

        if !keep_going {
            break;
        }
    }
}

async fn connect_to_peer(node: &Node, prompt: &mut Prompt) -> bool {
    let Some(host) = prompt.ask("Peer host: ").await else {
        return false;
    };
    let Some(port) = prompt.ask("Peer port: ").await else {
        return false;
    };

    let port: u16 = match port.parse() {
        Ok(port) => port,
        Err(_) => {
            println!("Invalid port: {port}");
            return true;
        }
    };

    match node.connect(&host, port).await {
        Ok(_) => println!("Connected to {host}:{port}"),
        Err(e) => println!("Could not connect to {host}:{port}: {e}"),
    }
    true
}

async fn create_transaction(node: &Node, prompt: &mut Prompt) -> bool {
    let Some(recipient) = prompt.ask("Recipient address: ").await else {
        return false;
    };
    let Some(amount) = prompt.ask("Amount: ").await else {
        return false;
    };

    let amount: f64 = match amount.parse() {
        Ok(amount) => amount,
        Err(_) => {
            println!("Invalid amount: {amount}");
            return true;
        }
    };

    match node.create_transaction(&recipient, amount).await {
        Ok(transaction) => println!("Created {transaction}"),
        Err(e) => println!("Transaction failed: {e}"),
    }
    true
}

fn list_transactions(node: &Node) {
    let transactions = node.transactions();
    if transactions.is_empty() {
        println!("No transactions yet.");
        return;
    }

    println!("Transactions ({}):", transactions.len());
    for (index, transaction) in transactions.iter().enumerate() {
        println!("{:>4}. {}", index + 1, transaction);
    }
}
