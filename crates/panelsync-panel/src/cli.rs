//! CLI module for panel client administration.
//!
//! Operates directly on the panels named in a panelsync config file. It can
//! be used as a subcommand of the main panelsync CLI.
//!
//! # Usage
//!
//! ```bash
//! # List clients on an inbound
//! panelsync client list -c panelsync.toml -s de-1 -i 3
//!
//! # Show one user's traffic across every configured inbound
//! panelsync client show -c panelsync.toml -u 123456
//!
//! # Set a new quota and lifetime
//! panelsync client edit -c panelsync.toml -s de-1 -i 3 -u 123456 --total-gb 50 --days 30
//!
//! # Delete a client
//! panelsync client delete -c panelsync.toml -s de-1 -i 3 -u 123456
//! ```

use std::path::PathBuf;

use chrono::{DateTime, Local, TimeZone};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tabled::{Table, Tabled};

use panelsync_config::{Config, ServerTarget, load_config, validate_config};
use panelsync_core::{DAYS_TO_MS, format_bytes, gb_to_bytes};

use crate::http::HttpPanel;
use crate::model::ClientIdentity;
use crate::traits::PanelApi;

/// Panel client administration CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "panelsync-client",
    version,
    about = "Inspect and edit clients on configured panels"
)]
pub struct ClientArgs {
    /// Config file path.
    #[arg(short, long, global = true, default_value = "panelsync.toml", env = "PANELSYNC_CONFIG")]
    pub config: PathBuf,

    /// Override shared panel password.
    #[arg(long, global = true, env = "PANELSYNC_PANEL_PASSWORD", hide_env_values = true)]
    pub panel_password: Option<String>,

    #[command(subcommand)]
    pub command: ClientCommands,
}

/// Client CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ClientCommands {
    /// List clients on an inbound.
    List {
        /// Server name from the config.
        #[arg(short, long)]
        server: String,

        /// Inbound id.
        #[arg(short, long)]
        inbound: u32,

        /// Output format (table, json).
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show a user's traffic on every configured inbound.
    Show {
        /// User id.
        #[arg(short, long)]
        user: String,

        /// Restrict to one server.
        #[arg(short, long)]
        server: Option<String>,

        /// Output format (table, json).
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Set a client's quota and lifetime.
    Edit {
        #[arg(short, long)]
        server: String,

        #[arg(short, long)]
        inbound: u32,

        #[arg(short, long)]
        user: String,

        /// New quota in GB (0 = unlimited).
        #[arg(long)]
        total_gb: f64,

        /// New lifetime in days from now (0 = never expires).
        #[arg(long)]
        days: u32,
    },

    /// Delete a client.
    Delete {
        #[arg(short, long)]
        server: String,

        #[arg(short, long)]
        inbound: u32,

        #[arg(short, long)]
        user: String,
    },
}

/// Client row for display.
#[derive(Tabled, Serialize)]
struct ClientDisplay {
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "UUID")]
    uuid: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Used")]
    used: String,
    #[tabled(rename = "Quota")]
    quota: String,
    #[tabled(rename = "Expires")]
    expires: String,
}

/// Traffic row for display.
#[derive(Tabled, Serialize)]
struct TrafficDisplay {
    #[tabled(rename = "Server")]
    server: String,
    #[tabled(rename = "Inbound")]
    inbound: u32,
    #[tabled(rename = "Upload")]
    uploaded: String,
    #[tabled(rename = "Download")]
    downloaded: String,
    #[tabled(rename = "Quota")]
    quota: String,
    #[tabled(rename = "Expires")]
    expires: String,
}

/// Run the client CLI with the given arguments.
pub async fn run(args: ClientArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;
    if let Some(password) = args.panel_password {
        config.panel.password = password;
    }
    validate_config(&config)?;

    match args.command {
        ClientCommands::List {
            server,
            inbound,
            format,
        } => list_clients(&config, &server, inbound, &format).await,
        ClientCommands::Show {
            user,
            server,
            format,
        } => show_user(&config, &user, server.as_deref(), &format).await,
        ClientCommands::Edit {
            server,
            inbound,
            user,
            total_gb,
            days,
        } => edit_client(&config, &server, inbound, &user, total_gb, days).await,
        ClientCommands::Delete {
            server,
            inbound,
            user,
        } => delete_client(&config, &server, inbound, &user).await,
    }
}

fn find_server<'a>(
    config: &'a Config,
    name: &str,
) -> Result<&'a ServerTarget, Box<dyn std::error::Error>> {
    config
        .server(name)
        .ok_or_else(|| format!("unknown server: {name}").into())
}

async fn connect(
    config: &Config,
    target: &ServerTarget,
) -> Result<HttpPanel, Box<dyn std::error::Error>> {
    let panel = HttpPanel::from_target(target, &config.panel)?;
    panel.login().await?;
    Ok(panel)
}

/// Format traffic limit (0 means unlimited).
fn format_quota(bytes: u64) -> String {
    if bytes == 0 {
        "Unlimited".to_string()
    } else {
        format_bytes(bytes)
    }
}

/// Format a panel expiry (ms since epoch, 0 = never).
fn format_expiry(ms: i64) -> String {
    if ms == 0 {
        return "Never".to_string();
    }
    match Local.timestamp_millis_opt(ms).single() {
        Some(at) => format_local(at),
        None => ms.to_string(),
    }
}

fn format_local(at: DateTime<Local>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

fn print_rows<T: Tabled + Serialize>(
    rows: Vec<T>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        _ => println!("{}", Table::new(rows)),
    }
    Ok(())
}

async fn list_clients(
    config: &Config,
    server: &str,
    inbound_id: u32,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = find_server(config, server)?;
    let panel = connect(config, target).await?;
    let inbound = panel.get_inbound(inbound_id).await?;

    if inbound.clients.is_empty() {
        println!("No clients on inbound {inbound_id}.");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(inbound.clients.len());
    for client in &inbound.clients {
        let identity = client_identity(&client.email, inbound_id);
        let used = match panel.get_traffic(&identity).await {
            Ok(Some(sample)) => format_bytes(sample.used()),
            Ok(None) => "-".to_string(),
            Err(e) => format!("error: {}", e.kind()),
        };
        rows.push(ClientDisplay {
            email: client.email.clone(),
            uuid: client.uuid.clone(),
            enabled: if client.enabled { "Yes" } else { "No" }.to_string(),
            used,
            quota: format_quota(client.total_bytes),
            expires: format_expiry(client.expiry_ms),
        });
    }
    print_rows(rows, format)
}

/// Identity for an email already stored on the panel.
fn client_identity(email: &str, inbound_id: u32) -> ClientIdentity {
    match email.rsplit_once('#') {
        Some((user, _)) => ClientIdentity::new(user, inbound_id),
        None => ClientIdentity::new(email, inbound_id),
    }
}

async fn show_user(
    config: &Config,
    user: &str,
    server: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rows = Vec::new();
    for target in &config.servers {
        if server.is_some_and(|s| s != target.name) {
            continue;
        }
        let panel = match connect(config, target).await {
            Ok(panel) => panel,
            Err(e) => {
                eprintln!("{}: {e}", target.name);
                continue;
            }
        };
        for &inbound_id in &target.inbounds {
            let identity = ClientIdentity::new(user, inbound_id);
            match panel.get_traffic(&identity).await {
                Ok(Some(sample)) => rows.push(TrafficDisplay {
                    server: target.name.clone(),
                    inbound: inbound_id,
                    uploaded: format_bytes(sample.uploaded),
                    downloaded: format_bytes(sample.downloaded),
                    quota: format_quota(sample.total_bytes),
                    expires: format_expiry(sample.expiry_ms),
                }),
                Ok(None) => {}
                Err(e) => eprintln!("{} inbound {inbound_id}: {e}", target.name),
            }
        }
    }

    if rows.is_empty() {
        println!("No traffic found for user {user}.");
        return Ok(());
    }
    print_rows(rows, format)
}

async fn edit_client(
    config: &Config,
    server: &str,
    inbound_id: u32,
    user: &str,
    total_gb: f64,
    days: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = find_server(config, server)?;
    let panel = connect(config, target).await?;
    let identity = ClientIdentity::new(user, inbound_id);
    let expiry_ms = if days == 0 {
        0
    } else {
        Local::now().timestamp_millis() + i64::from(days) * DAYS_TO_MS
    };

    let client = panel
        .edit_client(inbound_id, identity.as_str(), gb_to_bytes(total_gb), expiry_ms)
        .await?;

    println!("Client updated successfully.");
    println!("  Email: {}", client.email);
    println!("  Quota: {}", format_quota(client.total_bytes));
    println!("  Expires: {}", format_expiry(client.expiry_ms));
    Ok(())
}

async fn delete_client(
    config: &Config,
    server: &str,
    inbound_id: u32,
    user: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = find_server(config, server)?;
    let panel = connect(config, target).await?;
    let identity = ClientIdentity::new(user, inbound_id);

    if panel.remove_client(inbound_id, identity.as_str()).await? {
        println!("Client {identity} deleted.");
    } else {
        println!("No client {identity} on inbound {inbound_id}.");
    }
    Ok(())
}
