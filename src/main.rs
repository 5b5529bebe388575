// Community Fund Tracker - CLI
// Runs one command against a session backed by the spreadsheet (when
// configured) and the local SQLite cache.

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use community_fund::{
    ContributionDraft, FundConfig, PaymentType, Session, SheetsClient, SqliteKeyValueStore, SyncMode,
};
use std::env;
use std::fs::File;
use std::io::BufWriter;
use tracing_subscriber::EnvFilter;

type CliSession = Session<SheetsClient, SqliteKeyValueStore>;

const USAGE: &str = "\
Usage: community-fund <command>

Commands:
  status                 Show sync mode and dashboard totals (default)
  refresh                Re-fetch contributions, mentors and users from the spreadsheet
  init-sheets            Write header rows and default accounts to the spreadsheet
  export <path>          Write contributions to a CSV file
  add <donor> <village> <locality> <amount> <payment> <date> [contact]
                         Record a contribution (date as YYYY-MM-DD)";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();

    let config = FundConfig::load().context("Failed to load configuration")?;
    let kv = SqliteKeyValueStore::open(&config.cache_path)
        .with_context(|| format!("Failed to open local cache at {}", config.cache_path.display()))?;
    let service = SheetsClient::new(&config);

    let mut session = Session::start(config, service, kv).await;

    match args.get(1).map(String::as_str) {
        None | Some("status") => print_status(&session),
        Some("refresh") => run_refresh(&mut session).await?,
        Some("init-sheets") => run_init_sheets(&session).await?,
        Some("export") => run_export(&session, args.get(2))?,
        Some("add") => run_add(&mut session, &args[2..]).await?,
        Some("help") | Some("--help") | Some("-h") => println!("{}", USAGE),
        Some(other) => {
            eprintln!("{}", USAGE);
            bail!("Unknown command '{}'", other);
        }
    }

    Ok(())
}

fn print_status(session: &CliSession) {
    let status = session.status();
    let summary = session.dashboard(Local::now().date_naive());

    println!("💰 Community Fund Tracker v{}", community_fund::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Mode:           {}", status.mode);
    println!("Contributions:  {}", status.contributions);
    println!("Mentors:        {}", status.mentors);
    println!("Villages:       {}", status.villages);
    println!("Users:          {}", status.users);
    println!();
    println!("Total funds:    ₹{}", summary.total_funds);
    println!("Contributors:   {}", summary.total_contributors);
    println!("Today:          ₹{}", summary.today_total);

    println!("\n🏘️  By village:");
    for village in &summary.villages {
        println!(
            "   {:<14} ₹{:<10} {} contributors",
            village.village, village.total, village.contributors
        );
    }

    if status.mode == SyncMode::LocalOnly {
        println!("\n⚠️  Spreadsheet not connected, changes are kept in the local cache only");
    }
}

async fn run_refresh(session: &mut CliSession) -> Result<()> {
    session
        .refresh()
        .await
        .context("Refresh failed (is the spreadsheet configured?)")?;

    let status = session.status();
    println!(
        "✓ Refreshed: {} contributions, {} mentors, {} users",
        status.contributions, status.mentors, status.users
    );
    Ok(())
}

async fn run_init_sheets(session: &CliSession) -> Result<()> {
    session
        .initialize_sheets()
        .await
        .context("Failed to initialize spreadsheet")?;

    println!("✓ Spreadsheet initialized with headers and default accounts");
    Ok(())
}

fn run_export(session: &CliSession, path: Option<&String>) -> Result<()> {
    let Some(path) = path else {
        bail!("Missing output path\n\n{}", USAGE);
    };

    let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
    let count = session
        .export_csv(BufWriter::new(file))
        .context("Failed to write CSV")?;

    println!("✓ Exported {} contributions to {}", count, path);
    Ok(())
}

async fn run_add(session: &mut CliSession, args: &[String]) -> Result<()> {
    if args.len() < 6 {
        bail!("Expected at least 6 arguments for 'add'\n\n{}", USAGE);
    }

    let amount: i64 = args[3]
        .trim()
        .parse()
        .with_context(|| format!("Invalid amount '{}'", args[3]))?;
    let payment_type: PaymentType = args[4].parse().map_err(anyhow::Error::msg)?;
    let date = NaiveDate::parse_from_str(args[5].trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", args[5]))?;

    let draft = ContributionDraft {
        donor_name: args[0].clone(),
        donor_contact: args.get(6).cloned().unwrap_or_default(),
        village: args[1].clone(),
        locality: args[2].clone(),
        amount,
        payment_type: Some(payment_type),
        date: Some(date),
    };

    let (contribution, report) = session
        .submit_contribution(draft)
        .await
        .context("Contribution rejected")?;

    println!(
        "✓ Recorded ₹{} from {} ({}, {})",
        contribution.amount, contribution.donor_name, contribution.village, contribution.locality
    );
    println!("   id: {}", contribution.id);
    println!("   spreadsheet: {}", report.remote);
    if !report.persisted {
        println!("   ⚠️  local cache write failed, see log");
    }
    Ok(())
}
