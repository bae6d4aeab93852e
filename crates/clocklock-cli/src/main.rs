//! clocklock - command-line client for clocklockd
//!
//! Reports ticks, queries block status, and edits rules over the daemon's
//! socket. `clocklock poll` is a complete tick source for one domain.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use clocklock_api::{
    Command, GetStatusRequest, ResponsePayload, RuleView, TrackTimeRequest,
};
use clocklock_ipc::{IpcClient, IpcError};
use clocklock_util::{Domain, default_socket_path, format_duration};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod poll;

#[derive(Parser)]
#[command(name = "clocklock", version, about = "Control clocklockd")]
struct Cli {
    /// Socket path (or set CLOCKLOCK_SOCKET env var)
    #[arg(short, long, global = true)]
    socket: Option<PathBuf>,

    /// Print raw JSON payloads
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report active time for a domain
    Track {
        /// Hostname or URL
        domain: String,
        /// Elapsed time in milliseconds; negative takes time back
        #[arg(allow_negative_numbers = true)]
        delta_ms: i64,
    },
    /// Show block status for a domain
    Status { domain: String },
    /// Apply a pending cooldown reset without tracking time
    Sync { domain: String },
    /// Rule management
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
    /// Reload rules and site states from the store
    Reload,
    /// Show daemon health
    Health,
    /// Print daemon events as they happen
    Watch,
    /// Act as a tick source for one domain until Ctrl-C
    Poll {
        domain: String,
        /// Tick period in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },
}

#[derive(Subcommand)]
enum RulesAction {
    /// List all rules
    List,
    /// Show the rule for one domain
    Get { domain: String },
    /// Add or replace a rule
    Set {
        domain: String,
        /// Allowed active time in seconds
        #[arg(long)]
        limit: u64,
        /// Lockout in seconds once the limit is hit; 0 never blocks
        #[arg(long)]
        cooldown: u64,
        /// Count time while the tab is in the background
        #[arg(long)]
        background: bool,
    },
    /// Remove a rule (its accumulated time is kept)
    Remove { domain: String },
}

fn domain_arg(raw: &str) -> Result<Domain> {
    let domain = Domain::from_url_or_host(raw);
    if domain.is_empty() {
        bail!("'{}' does not contain a hostname", raw);
    }
    Ok(domain)
}

fn print_rule(rule: &RuleView) {
    let cooldown = if rule.cooldown_ms == 0 {
        "never blocks".to_string()
    } else {
        format!("cooldown {}", format_duration(Duration::from_millis(rule.cooldown_ms)))
    };
    println!(
        "{}: limit {}, {}{}",
        rule.domain,
        format_duration(Duration::from_millis(rule.time_limit_ms)),
        cooldown,
        if rule.track_in_background { ", tracks in background" } else { "" }
    );
}

fn print_payload(payload: &ResponsePayload, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(payload)?);
        return Ok(());
    }

    match payload {
        ResponsePayload::TrackTime(resp) => match (&resp.error, resp.cooldown_remaining_ms) {
            (Some(error), _) => bail!("tracking failed: {}", error),
            (None, Some(ms)) => println!(
                "blocked, cooldown {}",
                format_duration(Duration::from_millis(ms))
            ),
            (None, None) if resp.blocked => println!("blocked"),
            (None, None) => println!("allowed"),
        },
        ResponsePayload::Status(status) => {
            match status.cooldown_remaining_ms {
                Some(ms) if status.blocked => println!(
                    "blocked, cooldown {}",
                    format_duration(Duration::from_millis(ms))
                ),
                _ => println!("allowed"),
            }
            match status.time_left_ms {
                Some(ms) => println!("time left: {}", format_duration(Duration::from_millis(ms))),
                None => println!("no rule"),
            }
        }
        ResponsePayload::Synced { reset } => {
            println!("{}", if *reset { "cooldown cleared" } else { "nothing to do" })
        }
        ResponsePayload::Rules { rules } => {
            if rules.is_empty() {
                println!("no rules");
            }
            rules.iter().for_each(print_rule);
        }
        ResponsePayload::Rule { rule } => match rule {
            Some(rule) => print_rule(rule),
            None => println!("no rule"),
        },
        ResponsePayload::RuleSaved => println!("saved"),
        ResponsePayload::RuleRemoved { removed } => {
            println!("{}", if *removed { "removed" } else { "no such rule" })
        }
        ResponsePayload::RulesReloaded { rule_count } => println!("reloaded {} rules", rule_count),
        ResponsePayload::Health(health) => {
            println!("live: {}", health.live);
            println!("ready: {}", health.ready);
            println!("rules loaded: {}", health.rules_loaded);
            println!("store ok: {}", health.store_ok);
        }
        ResponsePayload::Subscribed { client_id } => println!("subscribed as {}", client_id),
        ResponsePayload::Unsubscribed => println!("unsubscribed"),
        ResponsePayload::Pong => println!("pong"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let socket_path = cli.socket.unwrap_or_else(default_socket_path);
    let mut client = match IpcClient::connect(&socket_path).await {
        Ok(client) => client,
        Err(IpcError::Io(e)) => bail!(
            "cannot reach clocklockd at {}: {}",
            socket_path.display(),
            e
        ),
        Err(e) => return Err(e.into()),
    };

    let command = match cli.command {
        Commands::Track { domain, delta_ms } => Command::TrackTime(TrackTimeRequest {
            domain: domain_arg(&domain)?,
            delta_ms,
        }),
        Commands::Status { domain } => Command::GetStatus(GetStatusRequest {
            domain: domain_arg(&domain)?,
        }),
        Commands::Sync { domain } => Command::SyncState {
            domain: domain_arg(&domain)?,
        },
        Commands::Rules { action } => match action {
            RulesAction::List => Command::ListRules,
            RulesAction::Get { domain } => Command::GetRule {
                domain: domain_arg(&domain)?,
            },
            RulesAction::Set {
                domain,
                limit,
                cooldown,
                background,
            } => Command::SetRule {
                rule: RuleView {
                    domain: domain_arg(&domain)?,
                    time_limit_ms: limit.saturating_mul(1000),
                    cooldown_ms: cooldown.saturating_mul(1000),
                    track_in_background: background,
                },
            },
            RulesAction::Remove { domain } => Command::RemoveRule {
                domain: domain_arg(&domain)?,
            },
        },
        Commands::Reload => Command::ReloadRules,
        Commands::Health => Command::GetHealth,
        Commands::Watch => {
            let mut events = client.subscribe().await?;
            loop {
                let event = events.next().await?;
                if cli.json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    println!("{} {:?}", event.timestamp.to_rfc3339(), event.payload);
                }
            }
        }
        Commands::Poll {
            domain,
            interval_ms,
        } => {
            let interval = Duration::from_millis(interval_ms.max(1));
            return poll::run(&mut client, domain_arg(&domain)?, interval).await;
        }
    };

    let payload = client.call(command).await?;
    print_payload(&payload, cli.json)
}
