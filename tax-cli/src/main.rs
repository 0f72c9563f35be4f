use std::path::PathBuf;

use anyhow::Result;
use chrono::Datelike;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::debug;

use tax_cli::app::{self, CalculateRequest, ReturnsCommand};
use tax_cli::config::AppConfig;
use tax_cli::logging;
use tax_core::TaxReturnFields;
use tax_core::access::Requester;
use tax_db_sqlite::SqliteRepository;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Irish income tax, USC, and PRSI calculator.
///
/// Computes liabilities from the stored per-year rate tables and manages
/// saved tax returns.
#[derive(Debug, Parser)]
#[command(name = "irish-tax", version)]
struct Cli {
    /// Settings file. Defaults to `irish-tax.toml` in the working directory
    /// when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database connection string, e.g. `sqlite:irish-tax.db` or
    /// `sqlite::memory:`. Overrides the config file and `IRISH_TAX_DB`.
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute the liability for an income. Unparseable amounts count as 0.
    Calculate(CalculateArgs),

    /// Show the rate table used for a tax year.
    Rates {
        /// Tax year; the most recent table is used when omitted or unknown.
        #[arg(long)]
        year: Option<i32>,
    },

    /// List filing deadlines for a tax year.
    Deadlines {
        /// Tax year; defaults to the current calendar year.
        #[arg(long)]
        year: Option<i32>,
    },

    /// Manage saved tax returns.
    Returns(ReturnsArgs),
}

#[derive(Debug, Args)]
struct CalculateArgs {
    /// Gross income.
    #[arg(long, allow_hyphen_values = true)]
    income: Option<String>,

    /// Deductions subtracted before income tax.
    #[arg(long, allow_hyphen_values = true)]
    deductions: Option<String>,

    /// Tax credits subtracted from gross tax.
    #[arg(long, allow_hyphen_values = true)]
    tax_credits: Option<String>,

    /// Tax year selecting the rate table.
    #[arg(long)]
    year: Option<String>,

    /// JSON request `{ "income", "deductions", "taxCredits", "year" }`
    /// instead of the individual flags.
    #[arg(long, conflicts_with_all = ["income", "deductions", "tax_credits", "year"])]
    request: Option<String>,

    /// Print the JSON response instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ReturnsArgs {
    /// Identity to act as.
    #[arg(long)]
    user: String,

    /// Act with administrator rights.
    #[arg(long)]
    admin: bool,

    #[command(subcommand)]
    action: ReturnsAction,
}

#[derive(Debug, Args)]
struct ReturnFieldArgs {
    #[arg(long)]
    income: Decimal,

    #[arg(long, default_value = "0")]
    deductions: Decimal,

    #[arg(long, default_value = "0")]
    tax_credits: Decimal,

    #[arg(long)]
    year: i32,
}

impl From<ReturnFieldArgs> for TaxReturnFields {
    fn from(args: ReturnFieldArgs) -> Self {
        TaxReturnFields {
            income: args.income,
            deductions: args.deductions,
            tax_credits: args.tax_credits,
            year: args.year,
        }
    }
}

#[derive(Debug, Subcommand)]
enum ReturnsAction {
    /// Save a new return owned by `--user`.
    Create(ReturnFieldArgs),
    /// List returns, newest tax year first.
    List {
        /// Whose returns to list; defaults to `--user`.
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show one return.
    Show { id: i64 },
    /// Replace the amounts and year of a return.
    Update {
        id: i64,
        #[command(flatten)]
        fields: ReturnFieldArgs,
    },
    /// Delete a return.
    Delete { id: i64 },
    /// Compute the liability of a saved return.
    Assess {
        id: i64,
        #[arg(long)]
        json: bool,
    },
}

impl From<ReturnsAction> for ReturnsCommand {
    fn from(action: ReturnsAction) -> Self {
        match action {
            ReturnsAction::Create(fields) => ReturnsCommand::Create(fields.into()),
            ReturnsAction::List { owner } => ReturnsCommand::List { owner },
            ReturnsAction::Show { id } => ReturnsCommand::Show(id),
            ReturnsAction::Update { id, fields } => ReturnsCommand::Update(id, fields.into()),
            ReturnsAction::Delete { id } => ReturnsCommand::Delete(id),
            ReturnsAction::Assess { id, json } => ReturnsCommand::Assess { id, json },
        }
    }
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?
        .with_env_overrides()
        .with_database_url(cli.db);

    logging::init_logging(&config.logging)?;
    debug!(?config, "configuration loaded");

    let output = match cli.command {
        Command::Deadlines { year } => {
            app::describe_deadlines(year.unwrap_or_else(|| chrono::Local::now().year()))
        }
        Command::Calculate(args) => {
            let repo = SqliteRepository::open(&config.database).await?;
            let schedule = app::load_schedule(&repo).await?;
            let request = CalculateRequest {
                income: args.income,
                deductions: args.deductions,
                tax_credits: args.tax_credits,
                year: args.year,
                body: args.request,
            };
            let liability = app::calculate(&schedule, &request)?;
            app::render_liability(&liability, args.json)?
        }
        Command::Rates { year } => {
            let repo = SqliteRepository::open(&config.database).await?;
            let schedule = app::load_schedule(&repo).await?;
            app::describe_rates(&schedule, year)
        }
        Command::Returns(args) => {
            let repo = SqliteRepository::open(&config.database).await?;
            let requester = if args.admin {
                Requester::admin(args.user)
            } else {
                Requester::user(args.user)
            };
            app::run_returns(&repo, &requester, args.action.into()).await?
        }
    };

    println!("{}", output.trim_end());
    Ok(())
}
