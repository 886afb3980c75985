use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "revoker-cli")]
#[command(about = "Command line client for the approval revoker service", long_about = None)]
struct Cli {
    #[arg(short, long, env = "REVOKER_URL", default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Revoke a token approval through a private relay bundle
    Revoke {
        #[arg(long)]
        token: String,
        #[arg(long)]
        spender: String,
        #[arg(long)]
        signer: String,
        /// Signer private key; read from the environment so it stays out of shell history
        #[arg(long, env = "REVOKER_SIGNER_KEY", hide_env_values = true)]
        key: String,
        #[arg(long, default_value = "ethereum")]
        chain: String,
        /// Name the request so it can be cancelled from another shell
        #[arg(long)]
        request_id: Option<String>,
    },
    /// Query bundle inclusion status
    Status {
        bundle_hash: String,
        #[arg(long, default_value = "ethereum")]
        chain: String,
        #[arg(long)]
        tx_hash: Option<String>,
        #[arg(long)]
        target_block: Option<u64>,
        /// Poll up to this many seconds for a final answer
        #[arg(long)]
        wait: Option<u64>,
    },
    /// Cancel a revocation that has not reached the relay yet
    Cancel { request_id: String },
    /// Check service liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Revoke {
            token,
            spender,
            signer,
            key,
            chain,
            request_id,
        } => {
            let mut req = client.post(format!("{base}/api/sponsored-tx")).json(&json!({
                "tokenAddress": token,
                "spenderAddress": spender,
                "signerAddress": signer,
                "signerPrivateKey": key,
                "chain": chain,
            }));
            if let Some(id) = request_id {
                req = req.header("x-request-id", id);
            }
            req.send().await?
        }
        Commands::Status {
            bundle_hash,
            chain,
            tx_hash,
            target_block,
            wait,
        } => {
            client
                .post(format!("{base}/api/bundle-status"))
                .json(&json!({
                    "bundleHash": bundle_hash,
                    "chain": chain,
                    "txHash": tx_hash,
                    "targetBlock": target_block,
                    "waitSecs": wait,
                }))
                .send()
                .await?
        }
        Commands::Cancel { request_id } => {
            client
                .post(format!("{base}/api/sponsored-tx/{request_id}/cancel"))
                .send()
                .await?
        }
        Commands::Health => client.get(format!("{base}/health")).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = serde_json::from_str::<Value>(&text)
        .and_then(|json| serde_json::to_string_pretty(&json))
        .unwrap_or(text);

    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        eprintln!("{}", body);
        return Err(format!("request failed with status {}", status).into());
    }

    println!("{}", body);
    Ok(())
}
