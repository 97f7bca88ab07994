//! Demo agent: calls protected tools through the gateway
//!
//! `echo`, `tickets` and `pay` each start a session for the tool's scope
//! (when none is ready), run the authorization leg, then invoke the tool.
//! `delegate` authors a signed delegation and uploads it to the
//! authorizer.

mod client;
mod delegate;

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

use client::GatewayClient;
use delegate::DelegationSpec;

#[derive(Parser)]
#[command(name = "iag-agent")]
#[command(about = "Agent client for the Identity-Aware Gateway")]
#[command(version)]
pub struct Cli {
    /// Gateway base URL
    #[arg(long, env = "AGENT_GW_BASE", default_value = "http://localhost:9100")]
    gateway: String,

    /// Authorizer base URL (for `delegate`)
    #[arg(long, env = "ADP_BASE", default_value = "http://localhost:9093")]
    authorizer: String,

    /// Print the authorize URL instead of driving it automatically
    #[arg(long)]
    manual: bool,

    /// Ceiling in seconds for readiness polling
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Call the echo tool
    Echo {
        #[arg(long, default_value = "hi")]
        msg: String,
    },
    /// List support tickets
    Tickets,
    /// Pay an order
    Pay {
        #[arg(long)]
        order_id: String,

        #[arg(long)]
        amount_cents: i64,

        #[arg(long)]
        merchant_id: String,
    },
    /// Author and upload a delegation to the authorizer
    Delegate {
        #[arg(long, default_value = "user-123")]
        subject: String,

        #[arg(long, default_value = "agent-demo")]
        agent_id: String,

        /// Tool identifier, e.g. mcp.pay
        #[arg(long)]
        tool: String,

        /// Comma-separated scopes, e.g. payments:charge
        #[arg(long, value_delimiter = ',')]
        scopes: Vec<String>,

        /// Validity in days
        #[arg(long, default_value_t = 7)]
        days: i64,

        #[arg(long)]
        max_amount_cents: Option<i64>,

        /// Comma-separated merchant allowlist
        #[arg(long, value_delimiter = ',')]
        merchants: Option<Vec<String>>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Echo { ref msg } => {
            let msg = msg.clone();
            let gateway = ensure_session(&cli, "mcp.echo", "echo:read", Map::new()).await?;
            let (status, body) = gateway.get_tool("/mcp/echo", &[("msg", msg.as_str())]).await?;
            print_result(status, &body);
        }
        Commands::Tickets => {
            let gateway = ensure_session(&cli, "mcp.tickets", "tickets:read", Map::new()).await?;
            let (status, body) = gateway.get_tool("/mcp/tickets", &[]).await?;
            print_result(status, &body);
        }
        Commands::Pay {
            ref order_id,
            amount_cents,
            ref merchant_id,
        } => {
            let mut context = Map::new();
            context.insert("orderId".into(), Value::from(order_id.clone()));
            context.insert("amount_cents".into(), Value::from(amount_cents));
            context.insert("merchant_id".into(), Value::from(merchant_id.clone()));

            let gateway = ensure_session(&cli, "mcp.pay", "payments:charge", context).await?;
            let (status, body) = gateway
                .post_tool(
                    "/mcp/pay",
                    json!({
                        "orderId": order_id,
                        "amount_cents": amount_cents,
                        "merchant_id": merchant_id,
                    }),
                )
                .await?;
            print_result(status, &body);
        }
        Commands::Delegate {
            subject,
            agent_id,
            tool,
            scopes,
            days,
            max_amount_cents,
            merchants,
        } => {
            let record = delegate::submit(
                &cli.authorizer,
                DelegationSpec {
                    subject,
                    agent_id,
                    tool_id: tool,
                    scopes,
                    days,
                    max_amount_cents,
                    merchants,
                },
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

/// Starts (or reuses) a session covering `scope` and waits for readiness.
async fn ensure_session(
    cli: &Cli,
    tool_id: &str,
    scope: &str,
    context: Map<String, Value>,
) -> Result<GatewayClient> {
    let gateway = GatewayClient::new(&cli.gateway)?;
    let ceiling = Duration::from_secs(cli.timeout_secs);

    // A ready session from an earlier run serves immediately.
    if gateway.wait_ready(scope, Duration::ZERO).await.is_ok() {
        return Ok(gateway);
    }

    let session = gateway.start_session(tool_id, scope, context).await?;
    tracing::info!(sid = %session.sid, "session started");

    if cli.manual {
        println!("Open in browser: {}", session.authorize_url);
    } else {
        gateway
            .drive_authorization(&session.authorize_url, &session.sid)
            .await?;
    }

    gateway.wait_ready(scope, ceiling).await?;
    Ok(gateway)
}

fn print_result(status: u16, body: &Value) {
    if (200..300).contains(&status) {
        println!("{}", serde_json::to_string_pretty(body).unwrap_or_default());
    } else {
        eprintln!(
            "request failed ({status}): {}",
            serde_json::to_string(body).unwrap_or_default()
        );
        std::process::exit(1);
    }
}
