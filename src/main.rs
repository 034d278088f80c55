// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tax_records::config::Config;
use tax_records::import::import_file;
use tax_records::logging::{init_logging, Verbosity};
use tax_records::schema::{MAX_TAX_YEAR, MIN_TAX_YEAR};
use tax_records::{EntityKind, Store, YearSummary};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "tax-records", version, about = "Personal tax-year bookkeeping")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the terminal UI (default)
    Ui,
    /// Provision a user for the HTTP API sign-in
    AddUser {
        username: String,
        /// Password; read from TAX_RECORDS_PASSWORD when omitted
        #[arg(long, env = "TAX_RECORDS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Import income or expense rows from a CSV file
    Import {
        #[arg(long, value_enum)]
        kind: ImportKind,
        /// Tax year the rows belong to
        #[arg(long, value_parser = year_parser())]
        year: i32,
        file: PathBuf,
    },
    /// Print the totals for one tax year
    Summary {
        #[arg(long, value_parser = year_parser())]
        year: i32,
    },
}

/// Accepts only years the store can hold
fn year_parser() -> clap::builder::RangedI64ValueParser<i32> {
    clap::value_parser!(i32).range(i64::from(MIN_TAX_YEAR)..=i64::from(MAX_TAX_YEAR))
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ImportKind {
    Income,
    Expense,
}

impl From<ImportKind> for EntityKind {
    fn from(kind: ImportKind) -> Self {
        match kind {
            ImportKind::Income => EntityKind::Income,
            ImportKind::Expense => EntityKind::Expense,
        }
    }
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();
    let command = cli.command.take().unwrap_or(Command::Ui);

    // Log output would draw over the terminal UI
    let verbosity = match (&command, cli.verbose) {
        (Command::Ui, 0) => Verbosity::Quiet,
        (_, count) => Verbosity::from_occurrences(count),
    };
    init_logging(verbosity);

    let config = load_config(&cli)?;
    let store = Store::open(&config.storage.database_path).with_context(|| {
        format!(
            "Failed to open database at {}",
            config.storage.database_path.display()
        )
    })?;

    match command {
        Command::Ui => run_ui_mode(store, &config),
        Command::AddUser { username, password } => run_add_user(&store, &username, &password),
        Command::Import { kind, year, file } => run_import(&store, kind.into(), year, &file),
        Command::Summary { year } => run_summary(&store, year),
    }
}

/// The CLI never serves tokens, so a missing JWT secret is not fatal here.
fn load_config(cli: &Cli) -> Result<Config> {
    match Config::load_from(cli.config.as_deref()) {
        Ok(config) => Ok(config),
        Err(tax_records::Error::ConfigValidation(reason)) => {
            info!(%reason, "configuration incomplete for the server; continuing");
            let mut config = Config::load_from_unchecked(cli.config.as_deref())?;
            config.auth.enabled = false;
            Ok(config)
        }
        Err(e) => Err(e).context("Failed to load configuration"),
    }
}

fn run_add_user(store: &Store, username: &str, password: &str) -> Result<()> {
    let user = store
        .with_conn(|conn| tax_records::users::create_user(conn, username, password))
        .with_context(|| format!("Failed to create user {username}"))?;
    println!("✓ Created user {} ({})", user.username, user.id);
    Ok(())
}

fn run_import(store: &Store, kind: EntityKind, year: i32, file: &PathBuf) -> Result<()> {
    if !file.exists() {
        bail!("CSV file not found: {}", file.display());
    }

    let report = import_file(store, file, kind, year)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    println!("✓ Imported {} {} rows into {}", report.inserted, report.kind, report.year);
    if report.outside_window > 0 {
        println!(
            "⚠ {} rows are dated outside tax year {}",
            report.outside_window,
            tax_records::TaxYearLabel(year)
        );
    }
    Ok(())
}

fn run_summary(store: &Store, year: i32) -> Result<()> {
    let (income, expenses) = store.with_conn(|conn| {
        Ok((
            tax_records::db::get_income_for_year(conn, year)?,
            tax_records::db::get_expenses_for_year(conn, year)?,
        ))
    })?;
    let summary = YearSummary::presented(year, &income, &expenses);

    println!("Tax year {}", summary.label);
    println!("  Income:      {:>12}  ({} records)", summary.total_income, summary.income_count);
    println!("  Expenses:    {:>12}  ({} records)", summary.total_expenses, summary.expense_count);
    println!("  Deductions:  {:>12}", summary.total_deductions);
    println!("  Net:         {:>12}", summary.net_amount);
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(store: Store, config: &Config) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let mut app = ui::App::new(store, config.ui.error_display(), today);
    ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_store: Store, _config: &Config) -> Result<()> {
    bail!("TUI mode not available; rebuild with `--features tui`")
}
