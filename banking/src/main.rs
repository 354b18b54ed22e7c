//! Mi Plata CLI
//!
//! Runs the banking service in-process: a scripted walkthrough over a fresh
//! client, or a one-off installment quote.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use miplata_banking::{BankConfig, BankService};
use miplata_common::{format_money, ClientId};
use miplata_ledger::InstallmentQuote;

/// Mi Plata CLI
#[derive(Parser, Debug)]
#[command(name = "miplata")]
#[command(about = "Mi Plata account and ledger engine")]
struct Args {
    /// Print service metrics in Prometheus format on exit
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a client's accounts, run a set of operations and print statements
    Demo {
        /// Client id to provision
        #[arg(long, default_value = "1")]
        client: u64,

        /// Opening savings deposit
        #[arg(long, default_value = "1000000")]
        savings: Decimal,

        /// Opening checking deposit
        #[arg(long, default_value = "500000")]
        checking: Decimal,
    },
    /// Price an installment purchase
    Quote {
        /// Amount financed
        #[arg(long)]
        principal: Decimal,

        /// Number of monthly installments (1 to 60)
        #[arg(long)]
        installments: u32,
    },
}

fn init_logging(config: &BankConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
    );

    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BankConfig::from_env();
    init_logging(&config);

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let args = Args::parse();
    info!(bank = %config.bank_name, "Starting Mi Plata");

    let service = BankService::new(config);

    match args.command {
        Command::Demo {
            client,
            savings,
            checking,
        } => run_demo(&service, ClientId::new(client), savings, checking).await?,
        Command::Quote {
            principal,
            installments,
        } => {
            let quote = InstallmentQuote::price(principal, installments)?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
    }

    if args.metrics {
        print!("{}", service.metrics().to_prometheus());
    }

    Ok(())
}

async fn run_demo(
    service: &BankService,
    client: ClientId,
    savings: Decimal,
    checking: Decimal,
) -> anyhow::Result<()> {
    let set = service.open_product_set(client)?;
    let savings_number = service.registry().get(set.savings).await?.number().to_string();
    let checking_number = service.registry().get(set.checking).await?.number().to_string();

    service.deposit(set.savings, savings, "opening deposit").await?;
    service.deposit(set.checking, checking, "opening deposit").await?;

    let balance = service
        .transfer(set.savings, &checking_number, dec!(200000), "rent")
        .await?;
    info!(balance = %format_money(balance), "Savings after transfer");

    let receipt = service
        .purchase_installments(set.credit_card, dec!(600000), 6, "laptop")
        .await?;
    info!(
        total = %format_money(receipt.total),
        monthly = %format_money(receipt.monthly_payment),
        "Installment purchase"
    );

    service
        .cash_advance(set.credit_card, &savings_number, dec!(50000), "travel cash")
        .await?;

    // Dips into the overdraft with the default opening deposits.
    if let Err(e) = service.withdraw(set.checking, dec!(800000), "car down payment").await {
        info!(code = e.error_code(), error = %e, "Withdrawal refused");
    }

    // Credit cards cannot transfer.
    if let Err(e) = service
        .transfer(set.credit_card, &savings_number, dec!(1000), "not allowed")
        .await
    {
        info!(code = e.error_code(), error = %e, "Transfer refused");
    }

    for id in [set.savings, set.checking, set.credit_card] {
        service.reconcile(id).await?;
        let summary = service.balance(id).await?;
        println!("{}", summary.describe());
        for movement in service.statement(id).await? {
            println!("  {}", movement.statement_line());
        }
    }

    let summary = service.client_summary(client).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
