use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "failover-cli")]
#[command(about = "Management CLI for the provider failover engine", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "FAILOVER_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Engine summary
    Status,
    /// Provider health, counters and recent probe history
    Providers,
    /// Currently active provider
    Active,
    /// Recent failover events
    Events {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Move traffic off the active provider
    Failover {
        /// Switch to this provider instead of the best alternative
        #[arg(short, long)]
        target: Option<String>,
        /// Operator note recorded with the failover event
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Probe every provider now
    Recheck,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );
    let client = reqwest::Client::builder().default_headers(headers).build()?;
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", base)).send().await?,
        Commands::Providers => client.get(format!("{}/admin/providers", base)).send().await?,
        Commands::Active => client.get(format!("{}/admin/active", base)).send().await?,
        Commands::Events { limit } => {
            client
                .get(format!("{}/admin/events", base))
                .query(&[("limit", limit)])
                .send()
                .await?
        }
        Commands::Failover { target, reason } => {
            client
                .post(format!("{}/admin/failover", base))
                .json(&json!({ "target": target, "reason": reason }))
                .send()
                .await?
        }
        Commands::Recheck => client.post(format!("{}/admin/recheck", base)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        return Err(format!("admin API returned status {}: {}", status, text).into());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
