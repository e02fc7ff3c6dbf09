//! Example walking a plan payment through the ledger, across a restart.
//!
//! Run with: cargo run --example payment_flow
//! Set DELIVERY_LEDGER_DIR to keep the ledger between runs.

use delivery_kit::{
    error::Result,
    observability::LogMetrics,
    storage::FileStorage,
    LedgerConfig, PaymentLedger, PaymentStatus,
};

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .ok();

    println!("\n=== Delivery Kit - Payment Flow ===\n");

    let dir = std::env::var("DELIVERY_LEDGER_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("delivery-kit-demo"));
    let config = LedgerConfig::from_env()?;

    println!("1. Opening ledger in {}...", dir.display());
    let mut ledger = PaymentLedger::open(FileStorage::open(&dir)?, config.clone())?
        .with_metrics(Box::new(LogMetrics));
    println!("   ✓ {} payments on record\n", ledger.len());

    println!("2. Subscribing to a plan:");
    let payment = ledger.create("Plano Ouro", 99.90, Some("Cantina da Nonna"));
    println!("   id:       {}", payment.id);
    println!("   status:   {}", payment.status);
    println!("   due:      {}", payment.due_at);
    println!("   PIX code: {}\n", payment.pix_code);

    println!("3. Confirming payment:");
    println!("   mark_paid({}) -> {}", payment.id, ledger.mark_paid(&payment.id));
    println!("   mark_paid(\"unknown\") -> {}\n", ledger.mark_paid("unknown"));

    println!("4. Reopening the ledger (simulated restart):");
    let reopened = PaymentLedger::open(FileStorage::open(&dir)?, config)?;
    for status in PaymentStatus::ALL {
        println!(
            "   {:<8} {}",
            status.as_str(),
            reopened.list_by_status(status).len()
        );
    }
    println!("   overdue  {}", reopened.overdue().len());

    println!("\n=== Done ===\n");
    Ok(())
}
