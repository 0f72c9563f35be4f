//! Command implementations for `irish-tax`.
//!
//! Each command returns the text to print so `main` only handles argument
//! parsing, setup, and output.

use anyhow::{Context, Result};
use tax_core::access::Requester;
use tax_core::calculations::compute_with;
use tax_core::deadlines::filing_deadlines;
use tax_core::input::RawTaxInput;
use tax_core::returns::TaxReturnService;
use tax_core::{RateSchedule, TaxInput, TaxLiability, TaxRepository, TaxReturn, TaxReturnFields};
use tracing::{debug, info};

/// Raw `calculate` flags, still as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct CalculateRequest {
    pub income: Option<String>,
    pub deductions: Option<String>,
    pub tax_credits: Option<String>,
    pub year: Option<String>,
    /// A JSON body `{ income, deductions, taxCredits, year }` that replaces
    /// the individual flags.
    pub body: Option<String>,
}

impl CalculateRequest {
    /// Normalizes the request. Bad amounts become zero; only a malformed
    /// JSON body is an error.
    pub fn to_input(&self) -> Result<TaxInput> {
        match &self.body {
            Some(body) => {
                let raw = RawTaxInput::from_json(body).context("request body is not a JSON object")?;
                Ok(raw.normalize())
            }
            None => Ok(TaxInput::from_text_fields(
                self.income.as_deref(),
                self.deductions.as_deref(),
                self.tax_credits.as_deref(),
                self.year.as_deref(),
            )),
        }
    }
}

pub fn calculate(
    schedule: &RateSchedule,
    request: &CalculateRequest,
) -> Result<TaxLiability> {
    let input = request.to_input()?;
    debug!(?input, "calculating liability");
    Ok(compute_with(schedule, &input))
}

/// Renders a liability as the JSON object API clients consume, or as a
/// table for people.
pub fn render_liability(
    liability: &TaxLiability,
    json: bool,
) -> Result<String> {
    if json {
        serde_json::to_string_pretty(liability).context("failed to serialize liability")
    } else {
        Ok(liability.to_string())
    }
}

/// Loads every stored rate table into a schedule. An empty store yields the
/// built-in tables.
pub async fn load_schedule<R: TaxRepository + ?Sized>(repo: &R) -> Result<RateSchedule> {
    let tables = repo
        .list_rate_tables()
        .await
        .context("failed to load rate tables")?;
    info!(count = tables.len(), "rate tables loaded");
    Ok(RateSchedule::from_tables(tables))
}

/// Describes the table `year` resolves to, noting when it is a fallback.
pub fn describe_rates(
    schedule: &RateSchedule,
    year: Option<i32>,
) -> String {
    let table = schedule.rates_for(year);
    let mut out = String::new();
    if let Some(year) = year.filter(|year| *year != table.tax_year) {
        out.push_str(&format!(
            "No rate table for {year}; using the most recent ({}).\n",
            table.tax_year
        ));
    }
    out.push_str(&table.to_string());
    out
}

pub fn describe_deadlines(year: i32) -> String {
    let mut out = format!("Filing deadlines for tax year {year}\n");
    for deadline in filing_deadlines(year) {
        out.push_str(&format!(
            "  {}  {}\n",
            deadline.date.format("%Y-%m-%d"),
            deadline.description
        ));
    }
    out
}

/// A `returns` subcommand after argument parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnsCommand {
    Create(TaxReturnFields),
    /// Defaults to the requester's own returns.
    List { owner: Option<String> },
    Show(i64),
    Update(i64, TaxReturnFields),
    Delete(i64),
    Assess { id: i64, json: bool },
}

/// Runs a `returns` subcommand as `requester`.
pub async fn run_returns<R: TaxRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
    command: ReturnsCommand,
) -> Result<String> {
    let service = TaxReturnService::from_repository(repo).await?;

    let output = match command {
        ReturnsCommand::Create(fields) => render_return(&service.create(requester, fields).await?)?,
        ReturnsCommand::List { owner } => {
            let owner = owner.unwrap_or_else(|| requester.user_id.clone());
            let returns = service.list_for_owner(requester, &owner).await?;
            serde_json::to_string_pretty(&returns).context("failed to serialize tax returns")?
        }
        ReturnsCommand::Show(id) => render_return(&service.get(requester, id).await?)?,
        ReturnsCommand::Update(id, fields) => {
            render_return(&service.update(requester, id, fields).await?)?
        }
        ReturnsCommand::Delete(id) => {
            service.delete(requester, id).await?;
            format!("Deleted tax return {id}")
        }
        ReturnsCommand::Assess { id, json } => {
            let assessment = service.assess(requester, id).await?;
            render_liability(&assessment.liability, json)?
        }
    };

    Ok(output)
}

fn render_return(tax_return: &TaxReturn) -> Result<String> {
    serde_json::to_string_pretty(tax_return).context("failed to serialize tax return")
}
