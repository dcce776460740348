//! Export service domain logic.
//!
//! Pure transformation of an already-filtered transaction list (plus
//! category/account lookups) into CSV or TXT, and the orchestration that
//! writes the result into the export directory. Content generation is
//! deterministic for a given input; only the filename embeds the generation
//! timestamp.

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Local};
use log::info;
use serde::Serialize;

use shared::{Account, CalendarSystem, Category, Transaction, TransactionType};

use crate::backend::domain::calendar;
use crate::backend::domain::commands::reports::{ExportFormat, ExportOutcome, ExportQuery};

/// One entry of the TXT export. Field order is part of the file format.
#[derive(Serialize)]
struct TxtRecord {
    date: String,
    account: String,
    #[serde(rename = "type")]
    transaction_type: String,
    category: String,
    amount: f64,
    description: String,
}

#[derive(Clone)]
pub struct ExportService {
    // No internal state needed for now
}

impl ExportService {
    pub fn new() -> Self {
        Self {}
    }

    /// Render the CSV export: header, one row per transaction with a running
    /// balance, and a trailing totals row. Input is sorted ascending by date
    /// before rendering.
    pub fn generate_csv(
        &self,
        transactions: &[Transaction],
        categories: &[Category],
        accounts: &[Account],
        calendar: CalendarSystem,
    ) -> Result<String> {
        let sorted = sort_ascending(transactions);

        let mut lines = Vec::with_capacity(sorted.len() + 2);
        lines.push("Date,Account,Type,Category,Description,Income,Expense,Balance".to_string());

        let mut running_balance = 0.0;
        let mut total_income = 0.0;
        let mut total_expense = 0.0;

        for transaction in &sorted {
            let is_income = transaction.transaction_type == TransactionType::Income;
            let (income, expense) = if is_income {
                total_income += transaction.amount;
                running_balance += transaction.amount;
                (transaction.amount.to_string(), String::new())
            } else {
                total_expense += transaction.amount;
                running_balance -= transaction.amount;
                (String::new(), transaction.amount.to_string())
            };

            lines.push(format!(
                "{},{},{},{},\"{}\",{},{},{}",
                calendar::format_date(transaction.date, calendar)?,
                account_name(accounts, &transaction.account),
                transaction.transaction_type,
                category_name(categories, &transaction.category),
                transaction.description.replace('"', "\"\""),
                income,
                expense,
                running_balance,
            ));
        }

        lines.push(format!(
            ",,,,\"Total\",{},{},{}",
            total_income, total_expense, running_balance
        ));

        Ok(lines.join("\n"))
    }

    /// Render the TXT export: a pretty-printed JSON array with the same
    /// fields as the CSV rows, minus the balance columns.
    pub fn generate_txt(
        &self,
        transactions: &[Transaction],
        categories: &[Category],
        accounts: &[Account],
        calendar: CalendarSystem,
    ) -> Result<String> {
        let sorted = sort_ascending(transactions);
        let records = sorted
            .iter()
            .map(|transaction| {
                Ok(TxtRecord {
                    date: calendar::format_date(transaction.date, calendar)?,
                    account: account_name(accounts, &transaction.account),
                    transaction_type: transaction.transaction_type.to_string(),
                    category: category_name(categories, &transaction.category),
                    amount: transaction.amount,
                    description: transaction.description.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Build the export filename. The context tag encodes the active filter;
    /// the trailing stamp is the generation time.
    pub fn export_filename(&self, query: &ExportQuery, generated_at: DateTime<Local>) -> String {
        let context = match (query.year, query.month) {
            (Some(year), Some(month)) => format!(
                "{}-{}{}-",
                calendar::month_name(month, query.calendar),
                year,
                query.calendar.label()
            ),
            (Some(year), None) => format!("{}{}-", year, query.calendar.label()),
            (None, Some(month)) => {
                format!("{}-", calendar::month_name(month, query.calendar))
            }
            (None, None) => String::new(),
        };
        let stamp = generated_at.format("exported-%Y-%m-%d_%H-%M-%S");
        format!(
            "nepali-wallet-{}{}.{}",
            context,
            stamp,
            query.format.extension()
        )
    }

    /// Full export run: render, resolve the target directory, write the
    /// file. The transaction list is expected to be filtered already.
    pub fn export_transactions(
        &self,
        transactions: &[Transaction],
        categories: &[Category],
        accounts: &[Account],
        query: &ExportQuery,
    ) -> Result<ExportOutcome> {
        if transactions.is_empty() {
            bail!("no transactions to export");
        }

        let content = match query.format {
            ExportFormat::Csv => {
                self.generate_csv(transactions, categories, accounts, query.calendar)?
            }
            ExportFormat::Txt => {
                self.generate_txt(transactions, categories, accounts, query.calendar)?
            }
        };
        let filename = self.export_filename(query, Local::now());

        let export_dir = match &query.output_dir {
            Some(dir) => dir.clone(),
            None => default_export_dir()?,
        };
        fs::create_dir_all(&export_dir)?;
        let file_path = export_dir.join(&filename);
        fs::write(&file_path, &content)?;

        info!(
            "📄 EXPORT: wrote {} transactions ({} bytes) to {}",
            transactions.len(),
            content.len(),
            file_path.display()
        );

        Ok(ExportOutcome {
            file_path,
            filename,
            transaction_count: transactions.len(),
        })
    }
}

impl Default for ExportService {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory exported files land in when the caller gives none:
/// `~/Documents/NepaliWallet`.
pub fn default_export_dir() -> Result<PathBuf> {
    let documents = dirs::document_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("could not determine home directory"))?;
    Ok(documents.join("NepaliWallet"))
}

fn sort_ascending(transactions: &[Transaction]) -> Vec<Transaction> {
    let mut sorted = transactions.to_vec();
    sorted.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    sorted
}

/// Resolve a category id to its display name, falling back to the raw id for
/// dangling references.
fn category_name(categories: &[Category], id: &str) -> String {
    categories
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| id.to_string())
}

/// Resolve an account id the same way.
fn account_name(accounts: &[Account], id: &str) -> String {
    accounts
        .iter()
        .find(|a| a.id == id)
        .map(|a| a.name.clone())
        .unwrap_or_else(|| id.to_string())
}
