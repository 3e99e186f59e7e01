use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use census_frontend::config::CensusConfig;
use census_frontend::pages::{AdminDashboard, RecordDetail, TableRow};
use census_frontend::services::{init_logging, ApiClient};

#[derive(Parser, Debug)]
#[command(name = "census-admin")]
#[command(about = "Browse and search the church census records")]
struct Cli {
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Free-text search over names, blocks, addresses and contact numbers
    #[arg(long, default_value = "")]
    search: String,
    /// Restrict to records whose KEY column contains TERM
    #[arg(long, value_name = "KEY=TERM", value_parser = parse_column_filter)]
    column: Option<ColumnFilter>,
    /// Print the detail of one household instead of the table
    #[arg(long, value_name = "ID")]
    show: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnFilter {
    key: String,
    term: String,
}

fn parse_column_filter(raw: &str) -> Result<ColumnFilter, String> {
    let (key, term) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=TERM, got '{}'", raw))?;
    if key.trim().is_empty() {
        return Err("column key must not be empty".to_string());
    }
    Ok(ColumnFilter {
        key: key.trim().to_string(),
        term: term.to_string(),
    })
}

fn print_rows(rows: &[TableRow]) {
    println!(
        "{:<14} {:<16} {:<32} {}",
        "Household_ID", "Block_Name", "Residential_Address", "Contact_No"
    );
    for row in rows {
        println!(
            "{:<14} {:<16} {:<32} {}",
            row.household_id, row.block_name, row.residential_address, row.contact_no
        );
    }
}

fn print_detail(detail: &RecordDetail) {
    println!("Household {}", detail.household_id);
    for (key, value) in &detail.household {
        println!("  {}: {}", key, value);
    }
    for (label, people) in [("Members", &detail.members), ("Children", &detail.children)] {
        println!("{} ({})", label, people.len());
        for person in people.iter() {
            println!(
                "  {} | {} | {} | {}",
                person.name, person.gender, person.date_of_birth, person.age
            );
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = CensusConfig::load(cli.config.as_deref())?;
    init_logging(&config.log_filter);
    info!("Using census endpoint {}", config.api_endpoint);

    let client = ApiClient::from_config(&config)?;
    let mut dashboard = AdminDashboard::new();
    dashboard.load(&client).await;
    if let Some(status) = dashboard.status().filter(|s| s.is_error()) {
        bail!("{}", status.text);
    }

    let summary = dashboard.summary();
    println!(
        "Households: {}  Members: {}  Children: {}",
        summary.households, summary.members, summary.children
    );

    if let Some(household_id) = cli.show {
        let Some(detail) = dashboard.select(&household_id) else {
            bail!("No household with id {}", household_id);
        };
        print_detail(detail);
        return Ok(());
    }

    let (column_key, column_term) = cli
        .column
        .as_ref()
        .map(|c| (c.key.as_str(), c.term.as_str()))
        .unwrap_or_default();
    dashboard.search(&cli.search, column_key, column_term);
    print_rows(&dashboard.rows());
    if let Some(status) = dashboard.status() {
        println!("{}", status.text);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
