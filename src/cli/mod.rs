use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::{
    AppError, Assistant, BankService, Direction, HistoryEntry, PaymentEntry, ReplySource,
};
use crate::config::Config;
use crate::domain::{format_cents, parse_cents, Account, Cents, NewAccount};

/// Banco - demo retail banking
#[derive(Parser)]
#[command(name = "banco")]
#[command(about = "Accounts, peer transfers, bill payments and a balance-aware assistant")]
#[command(version)]
pub struct Cli {
    /// Database file path (defaults to BANCO_DATABASE or banco.db)
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Username to act as
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Password for --user
    #[arg(long, env = "BANCO_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Open a new account (uses --user and --password)
    Register {
        /// 8-digit national ID
        #[arg(long)]
        national_id: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        email: Option<String>,
    },

    /// Show the current balance
    Balance,

    /// Show balance, recent transfers and recent payments
    Dashboard,

    /// Send money to another account
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Recipient national ID or username
        #[arg(long)]
        to: String,

        /// Description of the transfer
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List payable services
    Services,

    /// Pay a service bill
    Pay {
        /// Amount to pay (e.g., "50.00")
        amount: String,

        /// Service name or ID
        #[arg(short, long)]
        service: String,

        /// Invoice number
        #[arg(short, long)]
        invoice: Option<String>,
    },

    /// Show all transactions and payments
    History,

    /// Ask the assistant
    Chat {
        /// Message for the assistant
        message: String,
    },

    /// Verify ledger integrity
    Check,

    /// Export the account statement to CSV or JSON
    Export {
        /// Output format: csv or json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::from_env()?;
        let database = self
            .database
            .clone()
            .unwrap_or_else(|| config.database_path.clone());

        let service = match self.command {
            Commands::Init => BankService::init(&database).await?,
            _ => BankService::connect(&database).await.with_context(|| {
                format!("Failed to open database: {} (run `banco init` first)", database)
            })?,
        };

        let user = self.user.as_deref();
        let password = self.password.as_deref();

        match self.command {
            Commands::Init => {
                let services = service.list_services().await?;
                println!("Database initialized: {}", database);
                println!("Services available: {}", services.len());
            }
            Commands::Register {
                national_id,
                first_name,
                last_name,
                email,
            } => {
                let username = user.ok_or_else(|| {
                    AppError::InvalidInput("--user is required to register".into())
                })?;
                let account = service
                    .register(NewAccount {
                        username: username.to_string(),
                        national_id,
                        first_name,
                        last_name,
                        email,
                        password: password.unwrap_or_default().to_string(),
                    })
                    .await?;
                println!(
                    "Registered {} ({}) with balance S/ {}",
                    account.username,
                    account.display_name(),
                    format_cents(account.balance_cents)
                );
            }
            Commands::Balance => {
                let account = login(&service, user, password).await?;
                let balance = service.get_balance(account.id).await?;
                println!("{}: S/ {}", account.username, balance);
            }
            Commands::Dashboard => {
                let account = login(&service, user, password).await?;
                run_dashboard_command(&service, &account).await?;
            }
            Commands::Transfer {
                amount,
                to,
                description,
            } => {
                let account = login(&service, user, password).await?;
                let amount_cents = parse_amount(&amount)?;
                let record = service
                    .transfer(account.id, &to, amount_cents, description)
                    .await?;
                println!(
                    "Transferred S/ {} to {} ({})",
                    format_cents(record.transaction.amount_cents),
                    record.recipient_name,
                    record.recipient_username
                );
                println!("  Transaction: {}", record.transaction.id);
                println!("  New balance: S/ {}", format_cents(record.sender_balance));
            }
            Commands::Services => {
                let services = service.list_services().await?;
                println!("{:<5} NAME", "ID");
                println!("{}", "-".repeat(40));
                for s in services {
                    println!("{:<5} {}", s.id, s.name);
                }
            }
            Commands::Pay {
                amount,
                service: selector,
                invoice,
            } => {
                let account = login(&service, user, password).await?;
                let amount_cents = parse_amount(&amount)?;
                let target = service.find_service(&selector).await?;
                let record = service
                    .pay_service(account.id, target.id, amount_cents, invoice)
                    .await?;
                println!(
                    "Paid S/ {} to {}",
                    format_cents(record.payment.amount_cents),
                    record.service_name
                );
                println!("  Payment:     {}", record.payment.id);
                println!("  New balance: S/ {}", format_cents(record.payer_balance));
            }
            Commands::History => {
                let account = login(&service, user, password).await?;
                run_history_command(&service, &account).await?;
            }
            Commands::Chat { message } => {
                let identity = service.identify(user, password).await?;
                let assistant = Assistant::new(service.clone(), config.assistant.client());
                let reply = assistant.respond(&identity, &message).await;
                println!("{}", reply.text);
                if reply.source == ReplySource::Unavailable {
                    anyhow::bail!("Assistant unavailable");
                }
            }
            Commands::Check => {
                run_check_command(&service).await?;
            }
            Commands::Export { format, output } => {
                let account = login(&service, user, password).await?;
                run_export_command(&service, &account, &format, output.as_deref()).await?;
            }
        }

        Ok(())
    }
}

async fn login(
    service: &BankService,
    user: Option<&str>,
    password: Option<&str>,
) -> Result<Account, AppError> {
    let username = user.ok_or(AppError::AuthenticationRequired)?;
    service
        .authenticate(username, password.unwrap_or_default())
        .await
}

fn parse_amount(amount: &str) -> Result<Cents, AppError> {
    parse_cents(amount).map_err(|e| AppError::InvalidAmount(e.to_string()))
}

async fn run_dashboard_command(service: &BankService, account: &Account) -> Result<()> {
    let dashboard = service.dashboard(account.id).await?;

    println!("{} ({})", dashboard.account.display_name(), dashboard.account.username);
    println!("Balance: S/ {}", dashboard.balance);
    println!();

    println!("Recent transactions:");
    print_transactions(&dashboard.recent_transactions);
    println!();

    println!("Recent payments:");
    print_payments(&dashboard.recent_payments);
    Ok(())
}

async fn run_history_command(service: &BankService, account: &Account) -> Result<()> {
    let history = service.history(account.id).await?;

    println!("Transactions:");
    print_transactions(&history.transactions);
    println!();

    println!("Service payments:");
    print_payments(&history.payments);
    Ok(())
}

fn print_transactions(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("  No transactions found.");
        return;
    }

    println!(
        "  {:<17} {:>12} {:<20} DESCRIPTION",
        "DATE", "AMOUNT", "COUNTERPARTY"
    );
    println!("  {}", "-".repeat(72));
    for entry in entries {
        let counterparty = match (&entry.counterparty, entry.direction) {
            (Some(c), Direction::Sent) => format!("to {} {}", c.display_name, c.masked_national_id),
            (Some(c), Direction::Received) => {
                format!("from {} {}", c.display_name, c.masked_national_id)
            }
            (None, _) => entry.kind.to_string(),
        };
        println!(
            "  {:<17} {:>12} {:<20} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            format_cents(entry.signed_amount()),
            truncate(&counterparty, 20),
            truncate(entry.description.as_deref().unwrap_or(""), 30)
        );
    }
}

fn print_payments(entries: &[PaymentEntry]) {
    if entries.is_empty() {
        println!("  No payments found.");
        return;
    }

    println!("  {:<17} {:>12} {:<22} INVOICE", "DATE", "AMOUNT", "SERVICE");
    println!("  {}", "-".repeat(64));
    for entry in entries {
        println!(
            "  {:<17} {:>12} {:<22} {}",
            entry.payment.timestamp.format("%Y-%m-%d %H:%M"),
            format_cents(entry.payment.amount_cents),
            truncate(&entry.service_name, 22),
            entry.payment.invoice_number.as_deref().unwrap_or("N/A")
        );
    }
}

async fn run_check_command(service: &BankService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Accounts:     {}", report.account_count);
    println!("Transactions: {}", report.transaction_count);
    println!("Payments:     {}", report.payment_count);
    println!();

    println!(
        "  {:<10} {:>14}  {}",
        "Total:",
        format_cents(report.total_balance),
        if report.is_balanced() {
            "OK"
        } else {
            "UNBALANCED!"
        }
    );
    println!("  {:<10} {:>14}", "Expected:", format_cents(report.expected_total));
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

async fn run_export_command(
    service: &BankService,
    account: &Account,
    format: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match format {
        "csv" => {
            let count = exporter.export_statement_csv(account.id, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "json" => {
            let snapshot = exporter.export_statement_json(account.id, writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported statement: {} transactions, {} payments",
                    snapshot.transactions.len(),
                    snapshot.payments.len()
                );
            }
        }
        other => anyhow::bail!("Unknown export format: {} (expected csv or json)", other),
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_handles_accents() {
        assert_eq!(truncate("Teléfono fijo", 20), "Teléfono fijo");
        assert_eq!(truncate("Teléfono fijo (Movistar)", 10), "Teléfon...");
    }

    #[test]
    fn test_parse_amount_maps_errors() {
        assert_eq!(parse_amount("50.5").unwrap(), 5050);
        assert!(matches!(parse_amount("1.234"), Err(AppError::InvalidAmount(_))));
    }

    #[test]
    fn test_cli_parses_transfer() {
        let cli = Cli::parse_from([
            "banco", "--user", "ana", "transfer", "100.50", "--to", "87654321",
        ]);
        assert_eq!(cli.user.as_deref(), Some("ana"));
        assert!(matches!(cli.command, Commands::Transfer { ref to, .. } if to == "87654321"));
    }
}
