#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for checking mailbox logins and searching mailboxes (read-only)

use chrono::NaiveDate;
use clap::Parser;
use clap::builder::RangedU64ValueParser;
use mailkit::{
    Credentials, Error, Folder, FolderScope, KeywordSearch, MailKit, MailKitConfig, MessageRecord,
    ProxyConfig, ProxyKind, ScanScope, SearchCriteria, SearchResults, Security, ServerEndpoint,
};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailkit")]
#[command(about = "Check IMAP logins and search mailboxes, optionally through a proxy")]
#[allow(clippy::struct_excessive_bools)]
struct Args {
    /// Account address (with -p; otherwise both come from MAILKIT_EMAIL
    /// and MAILKIT_PASSWORD)
    #[arg(short, long, requires = "password")]
    email: Option<String>,

    /// Account password
    #[arg(short, long, requires = "email")]
    password: Option<String>,

    /// Only verify that the account can log in
    #[arg(long, conflicts_with = "scrap")]
    check: bool,

    /// Search for messages whose subject contains this text
    #[arg(long, value_name = "SUBJECT")]
    scrap: Option<String>,

    /// Only messages from this sender
    #[arg(long)]
    sender: Option<String>,

    /// Only messages mentioning this keyword in subject or body
    #[arg(long)]
    keyword: Option<String>,

    /// Only unread messages
    #[arg(long)]
    unseen: bool,

    /// Only messages received on or after this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    since: Option<NaiveDate>,

    /// Only messages received on this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    on: Option<NaiveDate>,

    /// Only messages received within this window: 30s, 5m, 2h, 1d
    /// (a bare number is minutes)
    #[arg(long, value_name = "WINDOW", value_parser = parse_window)]
    within: Option<Duration>,

    /// Folder to search, repeatable
    #[arg(long = "folder", default_value = "INBOX")]
    folders: Vec<String>,

    /// Search every folder the server lists
    #[arg(long, conflicts_with = "folders")]
    all_folders: bool,

    /// Maximum number of messages to show
    #[arg(
        long,
        default_value = "50",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    limit: usize,

    /// Print message bodies
    #[arg(long)]
    show_content: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Proxy type: HTTP or SOCKS5 (default HTTP)
    #[arg(long, value_parser = parse_proxy_kind)]
    proxy_type: Option<ProxyKind>,

    #[arg(long)]
    proxy_addr: Option<String>,

    #[arg(long)]
    proxy_port: Option<u16>,

    #[arg(long)]
    proxy_username: Option<String>,

    #[arg(long)]
    proxy_password: Option<String>,

    /// Seconds allowed for the proxy tunnel and for the IMAP login
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// IMAP server, bypassing the provider table
    #[arg(long)]
    imap_host: Option<String>,

    #[arg(long, requires = "imap_host")]
    imap_port: Option<u16>,

    /// Upgrade a plain connection with STARTTLS instead of implicit TLS
    #[arg(long, requires = "imap_host")]
    starttls: bool,

    /// Match keywords locally instead of with IMAP BODY search
    #[arg(long, requires = "imap_host")]
    client_keyword: bool,

    /// Accept invalid TLS certificates
    #[arg(long)]
    insecure: bool,
}

impl Args {
    const fn proxy_given(&self) -> bool {
        self.proxy_type.is_some()
            || self.proxy_addr.is_some()
            || self.proxy_port.is_some()
            || self.proxy_username.is_some()
            || self.proxy_password.is_some()
    }

    fn config(&self) -> mailkit::Result<MailKitConfig> {
        // clap makes -e and -p a pair.
        let mut config = match (&self.email, &self.password) {
            (Some(email), Some(password)) => {
                MailKitConfig::new(Credentials::new(email.as_str(), password.as_str()))
            }
            _ => MailKitConfig::from_env()?,
        };

        if self.proxy_given() {
            config.proxy = ProxyConfig::from_parts(
                self.proxy_type,
                self.proxy_addr.clone(),
                self.proxy_port,
                self.proxy_username.clone(),
                self.proxy_password.clone(),
            )?;
        }

        if let Some(host) = &self.imap_host {
            let mut server = ServerEndpoint::new(host.as_str());
            if let Some(port) = self.imap_port {
                server = server.with_port(port);
            }
            if self.starttls {
                server = server.with_security(Security::StartTls);
            }
            if self.client_keyword {
                server = server.with_keyword(KeywordSearch::ClientSide);
            }
            config.server = Some(server);
        }

        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        config.accept_invalid_certs |= self.insecure;

        config.scope = ScanScope {
            folders: if self.all_folders {
                FolderScope::All
            } else {
                FolderScope::Only(self.folders.iter().map(|f| Folder::from(f.as_str())).collect())
            },
            limit: self.limit,
            include_body: self.show_content,
        };
        Ok(config)
    }

    fn criteria(&self) -> SearchCriteria {
        let mut criteria = SearchCriteria::new();
        if let Some(subject) = &self.scrap {
            criteria = criteria.subject(subject.as_str());
        }
        if let Some(sender) = &self.sender {
            criteria = criteria.sender(sender.as_str());
        }
        if let Some(keyword) = &self.keyword {
            criteria = criteria.keyword(keyword.as_str());
        }
        if self.unseen {
            criteria = criteria.seen(false);
        }
        if let Some(date) = self.since {
            criteria = criteria.since(date);
        }
        if let Some(date) = self.on {
            criteria = criteria.on(date);
        }
        if let Some(window) = self.within {
            criteria = criteria.received_within(window);
        }
        criteria
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("Invalid date '{s}': {e}"))
}

fn parse_window(s: &str) -> Result<Duration, String> {
    let invalid = || format!("Invalid window '{s}': expected e.g. 30s, 5m, 2h or 1d");
    let (digits, unit) = s
        .find(|c: char| !c.is_ascii_digit())
        .map_or((s, "m"), |i| s.split_at(i));
    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    let secs = match unit {
        "s" => Some(amount),
        "m" => amount.checked_mul(60),
        "h" => amount.checked_mul(3600),
        "d" => amount.checked_mul(86_400),
        _ => None,
    };
    match secs {
        Some(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(invalid()),
    }
}

fn parse_proxy_kind(s: &str) -> Result<ProxyKind, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match args.config() {
        Ok(config) => config,
        Err(e) if args.check => {
            println!("invalid: {}", e.reason());
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };
    let kit = MailKit::new(config);

    if args.check {
        return Ok(cmd_check(&kit).await);
    }

    let results = kit.search(&args.criteria()).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results, args.show_content);
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_check(kit: &MailKit) -> ExitCode {
    match kit.check().await {
        Ok(()) => {
            println!("valid");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("invalid: {}", e.reason());
            ExitCode::FAILURE
        }
    }
}

fn print_results(results: &SearchResults, show_content: bool) {
    if results.is_empty() {
        println!("No emails found.");
        print_truncation(results);
        return;
    }

    let header = format!(
        "{:<12} {:<8} {:<20} {:<30} {}",
        "Folder", "UID", "Date", "From", "Subject"
    );
    println!("{header}");
    println!("{}", "-".repeat(112));

    for record in results {
        print_record(record);
        if show_content && let Some(body) = &record.body {
            println!("\n{body}\n");
        }
    }

    println!("\n{} email(s)", results.len());
    print_truncation(results);
}

fn print_truncation(results: &SearchResults) {
    if results.truncated {
        println!("Stopped at the limit of {}; more messages match.", results.limit);
    }
}

fn print_record(record: &MessageRecord) {
    println!(
        "{:<12} {:<8} {:<20} {:<30} {}",
        truncate(&record.content.folder, 12),
        record.content.uid,
        record.date.format("%Y-%m-%d %H:%M"),
        truncate(&record.sender, 28),
        truncate(&record.subject, 40),
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
