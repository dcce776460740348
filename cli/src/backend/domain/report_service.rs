//! Financial report generation.
//!
//! Renders a monthly or annual PDF report over the transactions of the
//! selected period: summary metrics, per-category breakdowns with a
//! proportional bar chart and legend, a month-over-month trend for annual
//! reports, account summaries and the full transaction listing with running
//! balances. Month bucketing follows the selected calendar system for
//! filtering, grouping and labels alike.

use std::fs;

use anyhow::{bail, Context, Result};
use chrono::Local;
use log::info;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rect, Rgb,
};

use shared::{Account, CalendarSystem, Category, Transaction, TransactionType};

use crate::backend::domain::calendar;
use crate::backend::domain::commands::reports::{ReportOutcome, ReportPeriod, ReportQuery};
use crate::backend::domain::export_service::default_export_dir;

const PAGE_WIDTH: f64 = 210.0;
const PAGE_HEIGHT: f64 = 297.0;
const MARGIN: f64 = 20.0;

const TEXT_PRIMARY: (u8, u8, u8) = (15, 23, 42);
const TEXT_SECONDARY: (u8, u8, u8) = (55, 65, 81);
const TEXT_MUTED: (u8, u8, u8) = (148, 163, 184);
const BG_LIGHT: (u8, u8, u8) = (241, 245, 249);
const BG_DARK: (u8, u8, u8) = (225, 230, 235);
const BORDER: (u8, u8, u8) = (226, 232, 240);
const SUCCESS: (u8, u8, u8) = (34, 197, 94);
const DANGER: (u8, u8, u8) = (239, 68, 68);

const CHART_COLORS: [(u8, u8, u8); 10] = [
    (34, 197, 94),
    (239, 68, 68),
    (99, 102, 241),
    (255, 140, 0),
    (128, 128, 128),
    (236, 72, 153),
    (6, 182, 212),
    (0, 128, 128),
    (255, 215, 0),
    (168, 85, 247),
];

/// Per-category aggregate, sorted descending by amount before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub name: String,
    pub amount: f64,
}

/// One month of the annual trend.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthTotal {
    pub month: &'static str,
    pub income: f64,
    pub expenses: f64,
}

/// One row of the accounts table.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRow {
    pub name: String,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

#[derive(Clone)]
pub struct ReportService {
    // No internal state needed for now
}

impl ReportService {
    pub fn new() -> Self {
        Self {}
    }

    /// Generate the report PDF and write it into the export directory.
    /// The transaction list is the unfiltered store content; period
    /// filtering happens here so labels and filters can never disagree.
    pub fn generate_report(
        &self,
        transactions: &[Transaction],
        accounts: &[Account],
        categories: &[Category],
        currency: &str,
        query: &ReportQuery,
    ) -> Result<ReportOutcome> {
        if query.period == ReportPeriod::Monthly && query.month.is_none() {
            bail!("a monthly report requires a month");
        }

        let filtered = filter_for_period(transactions, query)?;
        if filtered.is_empty() {
            bail!("no transactions available to generate report");
        }

        let (bytes, page_count) =
            self.render(&filtered, accounts, categories, currency, query)?;

        let filename = report_filename(query, Local::now());
        let export_dir = match &query.output_dir {
            Some(dir) => dir.clone(),
            None => default_export_dir()?,
        };
        fs::create_dir_all(&export_dir)?;
        let file_path = export_dir.join(&filename);
        fs::write(&file_path, &bytes)?;

        info!(
            "📄 REPORT: generated {} report with {} transactions ({} pages) at {}",
            match query.period {
                ReportPeriod::Monthly => "monthly",
                ReportPeriod::Annual => "annual",
            },
            filtered.len(),
            page_count,
            file_path.display()
        );

        Ok(ReportOutcome {
            file_path,
            filename,
            transaction_count: filtered.len(),
            page_count,
        })
    }

    fn render(
        &self,
        transactions: &[Transaction],
        accounts: &[Account],
        categories: &[Category],
        currency: &str,
        query: &ReportQuery,
    ) -> Result<(Vec<u8>, usize)> {
        let mut canvas = PdfCanvas::new("Financial Report")?;

        let total_income: f64 = transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Income)
            .map(|t| t.amount)
            .sum();
        let total_expenses: f64 = transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Expense)
            .map(|t| t.amount)
            .sum();
        let balance = total_income - total_expenses;

        self.draw_header(&mut canvas, query)?;
        self.draw_summary(
            &mut canvas,
            currency,
            total_income,
            total_expenses,
            balance,
            transactions.len(),
        );
        self.draw_overview(&mut canvas, currency, total_income, total_expenses, balance);

        let income_data =
            category_totals(transactions, TransactionType::Income, categories);
        self.draw_category_section(
            &mut canvas,
            "Income Analysis",
            "Income",
            "No income transactions recorded for this period.",
            &income_data,
            total_income,
            currency,
        );

        let expense_data =
            category_totals(transactions, TransactionType::Expense, categories);
        self.draw_category_section(
            &mut canvas,
            "Expense Analysis",
            "Expense",
            "No expense transactions recorded for this period.",
            &expense_data,
            total_expenses,
            currency,
        );

        if query.period == ReportPeriod::Annual {
            let months = monthly_totals(transactions, query.calendar)?;
            self.draw_monthly_trend(&mut canvas, &months);
        }

        self.draw_accounts_table(
            &mut canvas,
            &account_rows(accounts, transactions),
            currency,
            total_income,
            total_expenses,
        );
        self.draw_transactions_table(
            &mut canvas,
            transactions,
            accounts,
            categories,
            currency,
            query.calendar,
        )?;
        self.draw_footer(&mut canvas);

        let pages = canvas.pages;
        let bytes = canvas
            .doc
            .save_to_bytes()
            .context("failed to serialize PDF document")?;
        Ok((bytes, pages))
    }

    fn draw_header(&self, canvas: &mut PdfCanvas, query: &ReportQuery) -> Result<()> {
        canvas.card(15.0, 15.0, PAGE_WIDTH - 30.0, 30.0);
        let title = match query.period {
            ReportPeriod::Monthly => "Financial Report",
            ReportPeriod::Annual => "Annual Financial Report",
        };
        canvas.text(title, 24.0, 25.0, 27.0, true, TEXT_PRIMARY);

        let subheading = match (query.period, query.month) {
            (ReportPeriod::Monthly, Some(month)) => format!(
                "{} {} {}",
                calendar::month_name(month, query.calendar),
                query.year,
                query.calendar.label()
            ),
            _ => format!("{} {}", query.year, query.calendar.label()),
        };
        canvas.text(&subheading, 14.0, 25.0, 38.0, false, TEXT_PRIMARY);

        let generated = format!(
            "Generated: {}",
            calendar::format_date(Local::now().date_naive(), query.calendar)?
        );
        canvas.text_right(&generated, 9.0, PAGE_WIDTH - 25.0, 42.0, false, TEXT_MUTED);

        canvas.y = 58.0;
        Ok(())
    }

    fn draw_summary(
        &self,
        canvas: &mut PdfCanvas,
        currency: &str,
        total_income: f64,
        total_expenses: f64,
        balance: f64,
        transaction_count: usize,
    ) {
        let card_width = (PAGE_WIDTH - 55.0) / 3.0;
        let card_height = 26.0;
        let metrics = [
            (
                "Total Income",
                format!("{currency} {}", format_number(total_income)),
                SUCCESS,
            ),
            (
                "Total Expenses",
                format!("{currency} {}", format_number(total_expenses)),
                DANGER,
            ),
            (
                "Net Balance",
                format!(
                    "{} {currency} {}",
                    if balance >= 0.0 { "+" } else { "-" },
                    format_number(balance.abs())
                ),
                TEXT_SECONDARY,
            ),
        ];

        for (index, (label, value, color)) in metrics.iter().enumerate() {
            let card_x = 15.0 + index as f64 * (card_width + 5.0);
            canvas.card(card_x, canvas.y, card_width, card_height);
            // Colored accent bar along the card top.
            canvas.fill_rect(card_x, canvas.y, card_width, 2.0, *color);
            canvas.text_center(
                label,
                9.0,
                card_x + card_width / 2.0,
                canvas.y + 10.0,
                false,
                TEXT_SECONDARY,
            );
            canvas.text_center(
                value,
                12.0,
                card_x + card_width / 2.0,
                canvas.y + 20.0,
                true,
                TEXT_PRIMARY,
            );
        }
        canvas.y += card_height + 10.0;

        let savings = savings_rate(total_income, total_expenses);
        let savings_text = match savings {
            Some(rate) => format!("Savings Rate: {rate:.2}%"),
            None => "Savings Rate: --%".to_string(),
        };
        canvas.card(15.0, canvas.y, 85.0, 14.0);
        canvas.text(&savings_text, 10.0, 20.0, canvas.y + 9.0, true, TEXT_SECONDARY);

        canvas.card(105.0, canvas.y, 85.0, 14.0);
        canvas.text(
            &format!("Total Transactions: {transaction_count}"),
            10.0,
            110.0,
            canvas.y + 9.0,
            true,
            TEXT_SECONDARY,
        );
        canvas.y += 26.0;
    }

    /// Income vs. expenses as one proportional stacked bar with the totals
    /// alongside.
    fn draw_overview(
        &self,
        canvas: &mut PdfCanvas,
        currency: &str,
        total_income: f64,
        total_expenses: f64,
        balance: f64,
    ) {
        canvas.ensure_space(70.0);
        canvas.section_header("Income vs Expenses Overview");

        canvas.card(15.0, canvas.y, PAGE_WIDTH - 30.0, 46.0);
        let bar_x = 25.0;
        let bar_width = PAGE_WIDTH - 50.0;
        let bar_y = canvas.y + 10.0;
        let total = total_income + total_expenses;
        let income_share = if total > 0.0 { total_income / total } else { 0.0 };

        canvas.fill_rect(bar_x, bar_y, bar_width, 8.0, BG_LIGHT);
        canvas.fill_rect(bar_x, bar_y, bar_width * income_share, 8.0, SUCCESS);
        canvas.fill_rect(
            bar_x + bar_width * income_share,
            bar_y,
            bar_width * (1.0 - income_share),
            8.0,
            DANGER,
        );

        let mut row_y = bar_y + 16.0;
        canvas.fill_rect(bar_x, row_y - 3.0, 4.0, 4.0, SUCCESS);
        canvas.text(
            &format!("Total Income: {currency} {}", format_number(total_income)),
            10.0,
            bar_x + 7.0,
            row_y,
            false,
            TEXT_SECONDARY,
        );
        row_y += 8.0;
        canvas.fill_rect(bar_x, row_y - 3.0, 4.0, 4.0, DANGER);
        canvas.text(
            &format!(
                "Total Expenses: {currency} {}",
                format_number(total_expenses)
            ),
            10.0,
            bar_x + 7.0,
            row_y,
            false,
            TEXT_SECONDARY,
        );

        let balance_color = if balance >= 0.0 { SUCCESS } else { DANGER };
        canvas.text_right(
            &format!(
                "Net Balance: {} {currency} {}",
                if balance >= 0.0 { "+" } else { "-" },
                format_number(balance.abs())
            ),
            11.0,
            PAGE_WIDTH - 25.0,
            row_y,
            true,
            balance_color,
        );

        canvas.y += 56.0;
    }

    /// A category breakdown: proportional bars with a color legend and
    /// percentages (the pie-chart equivalent), followed by a details table.
    fn draw_category_section(
        &self,
        canvas: &mut PdfCanvas,
        title: &str,
        group_label: &str,
        empty_message: &str,
        data: &[CategoryTotal],
        group_total: f64,
        currency: &str,
    ) {
        canvas.ensure_space(60.0);
        canvas.section_header(title);

        if data.is_empty() {
            canvas.card(15.0, canvas.y, PAGE_WIDTH - 30.0, 20.0);
            canvas.text(
                empty_message,
                11.0,
                25.0,
                canvas.y + 12.0,
                false,
                TEXT_SECONDARY,
            );
            canvas.y += 32.0;
            return;
        }

        let shown = data.len().min(10);
        let legend_height = shown as f64 * 7.0 + 16.0;
        canvas.ensure_space(legend_height + 10.0);
        canvas.card(15.0, canvas.y, PAGE_WIDTH - 30.0, legend_height);

        let legend_title = if data.len() > 10 {
            format!("Top 10 {group_label} Categories")
        } else {
            format!("{group_label} Categories")
        };
        canvas.text(&legend_title, 10.0, 25.0, canvas.y + 9.0, true, TEXT_PRIMARY);

        let bar_max_width = 60.0;
        let mut row_y = canvas.y + 17.0;
        for (index, category) in data.iter().take(10).enumerate() {
            let color = CHART_COLORS[index % CHART_COLORS.len()];
            let share = if group_total > 0.0 {
                category.amount / group_total
            } else {
                0.0
            };

            canvas.fill_rect(25.0, row_y - 3.0, 4.0, 4.0, color);
            canvas.text(
                &truncate(&category.name, 18),
                9.0,
                32.0,
                row_y,
                false,
                TEXT_SECONDARY,
            );
            canvas.fill_rect(95.0, row_y - 3.0, bar_max_width, 4.0, BG_LIGHT);
            canvas.fill_rect(95.0, row_y - 3.0, bar_max_width * share, 4.0, color);
            canvas.text_right(
                &format!("{:.2}%", share * 100.0),
                9.0,
                PAGE_WIDTH - 25.0,
                row_y,
                true,
                TEXT_PRIMARY,
            );
            row_y += 7.0;
        }
        canvas.y += legend_height + 8.0;

        // Details table: every category, not just the legend's top ten.
        canvas.ensure_space(30.0);
        let details_title = format!("{group_label} Details");
        canvas.text(&details_title, 13.0, MARGIN, canvas.y, true, TEXT_PRIMARY);
        canvas.y += 3.0;
        canvas.divider();
        canvas.y += 8.0;

        canvas.table_header(&[
            ("Category", 25.0),
            ("Amount", PAGE_WIDTH / 2.0 - 10.0),
            ("Percentage", PAGE_WIDTH - 55.0),
        ]);
        for (index, category) in data.iter().enumerate() {
            if canvas.ensure_space(8.0) {
                canvas.table_header(&[
                    ("Category", 25.0),
                    ("Amount", PAGE_WIDTH / 2.0 - 10.0),
                    ("Percentage", PAGE_WIDTH - 55.0),
                ]);
            }
            if index % 2 == 1 {
                canvas.fill_rect(MARGIN, canvas.y - 4.5, PAGE_WIDTH - 40.0, 7.0, BG_LIGHT);
            }
            canvas.text(
                &truncate(&category.name, 25),
                9.0,
                25.0,
                canvas.y,
                false,
                TEXT_SECONDARY,
            );
            canvas.text(
                &format!("{currency} {}", format_number(category.amount)),
                9.0,
                PAGE_WIDTH / 2.0 - 10.0,
                canvas.y,
                false,
                TEXT_PRIMARY,
            );
            let percentage = if group_total > 0.0 {
                category.amount / group_total * 100.0
            } else {
                0.0
            };
            canvas.text(
                &format!("{percentage:.2}%"),
                9.0,
                PAGE_WIDTH - 55.0,
                canvas.y,
                false,
                TEXT_PRIMARY,
            );
            canvas.y += 7.0;
        }
        canvas.y += 10.0;
    }

    /// Month-over-month income/expense bars for annual reports.
    fn draw_monthly_trend(&self, canvas: &mut PdfCanvas, months: &[MonthTotal]) {
        canvas.ensure_space(85.0);
        canvas.section_header("Monthly Trend");

        canvas.card(15.0, canvas.y, PAGE_WIDTH - 30.0, 70.0);

        let max_amount = months
            .iter()
            .map(|m| m.income.max(m.expenses))
            .fold(0.0f64, f64::max);

        // Legend in the card's top-right corner.
        canvas.fill_rect(PAGE_WIDTH - 60.0, canvas.y + 5.0, 3.0, 3.0, SUCCESS);
        canvas.text("Income", 8.0, PAGE_WIDTH - 55.0, canvas.y + 8.0, false, TEXT_SECONDARY);
        canvas.fill_rect(PAGE_WIDTH - 38.0, canvas.y + 5.0, 3.0, 3.0, DANGER);
        canvas.text(
            "Expenses",
            8.0,
            PAGE_WIDTH - 33.0,
            canvas.y + 8.0,
            false,
            TEXT_SECONDARY,
        );

        let chart_height = 40.0;
        let baseline = canvas.y + 55.0;
        let slot_width = (PAGE_WIDTH - 50.0) / 12.0;
        canvas.line(25.0, baseline, PAGE_WIDTH - 25.0, baseline, BORDER);

        for (index, month) in months.iter().enumerate() {
            let x = 25.0 + index as f64 * slot_width;
            if max_amount > 0.0 {
                let income_height = month.income / max_amount * chart_height;
                let expense_height = month.expenses / max_amount * chart_height;
                if income_height > 0.0 {
                    canvas.fill_rect(x + 2.0, baseline - income_height, 4.0, income_height, SUCCESS);
                }
                if expense_height > 0.0 {
                    canvas.fill_rect(x + 7.0, baseline - expense_height, 4.0, expense_height, DANGER);
                }
            }
            canvas.text(month.month, 6.5, x + 1.0, baseline + 5.0, false, TEXT_MUTED);
        }

        canvas.y += 82.0;
    }

    fn draw_accounts_table(
        &self,
        canvas: &mut PdfCanvas,
        rows: &[AccountRow],
        currency: &str,
        total_income: f64,
        total_expenses: f64,
    ) {
        canvas.ensure_space(50.0);
        canvas.section_header("Accounts List");

        let columns = [
            ("Account", 25.0),
            ("Income", 85.0),
            ("Expense", 120.0),
            ("Balance", 155.0),
        ];
        canvas.table_header(&columns);

        for (index, row) in rows.iter().enumerate() {
            if canvas.ensure_space(8.0) {
                canvas.table_header(&columns);
            }
            if index % 2 == 1 {
                canvas.fill_rect(MARGIN, canvas.y - 4.5, PAGE_WIDTH - 40.0, 7.0, BG_LIGHT);
            }
            canvas.text(&truncate(&row.name, 30), 9.0, 25.0, canvas.y, false, TEXT_SECONDARY);
            canvas.text(
                &dash_or_amount(currency, row.income),
                9.0,
                85.0,
                canvas.y,
                row.income > 0.0,
                SUCCESS,
            );
            canvas.text(
                &dash_or_amount(currency, row.expense),
                9.0,
                120.0,
                canvas.y,
                row.expense > 0.0,
                DANGER,
            );
            canvas.text(
                &signed_amount(currency, row.balance),
                9.0,
                155.0,
                canvas.y,
                true,
                TEXT_PRIMARY,
            );
            canvas.y += 7.0;
        }

        if canvas.ensure_space(10.0) {
            canvas.table_header(&columns);
        }
        canvas.fill_rect(MARGIN, canvas.y - 4.5, PAGE_WIDTH - 40.0, 8.0, BG_DARK);
        canvas.text("TOTAL", 10.0, 25.0, canvas.y, true, TEXT_PRIMARY);
        canvas.text(
            &format!("{currency} {}", format_number(total_income)),
            10.0,
            85.0,
            canvas.y,
            true,
            SUCCESS,
        );
        canvas.text(
            &format!("{currency} {}", format_number(total_expenses)),
            10.0,
            120.0,
            canvas.y,
            true,
            DANGER,
        );
        canvas.text(
            &signed_amount(currency, total_income - total_expenses),
            10.0,
            155.0,
            canvas.y,
            true,
            TEXT_PRIMARY,
        );
        canvas.y += 14.0;
    }

    fn draw_transactions_table(
        &self,
        canvas: &mut PdfCanvas,
        transactions: &[Transaction],
        accounts: &[Account],
        categories: &[Category],
        currency: &str,
        calendar_system: CalendarSystem,
    ) -> Result<()> {
        canvas.ensure_space(50.0);
        canvas.section_header("Transactions List");

        let columns = [
            ("Date", 25.0),
            ("Account", 50.0),
            ("Category", 82.0),
            ("Income", 115.0),
            ("Expense", 140.0),
            ("Balance", 165.0),
        ];
        canvas.table_header(&columns);

        let mut running_balance = 0.0;
        let mut total_income = 0.0;
        let mut total_expense = 0.0;

        for (index, transaction) in transactions.iter().enumerate() {
            if canvas.ensure_space(8.0) {
                canvas.table_header(&columns);
            }
            if index % 2 == 1 {
                canvas.fill_rect(MARGIN, canvas.y - 4.5, PAGE_WIDTH - 40.0, 7.0, BG_LIGHT);
            }

            let is_income = transaction.transaction_type == TransactionType::Income;
            let (income, expense) = if is_income {
                (transaction.amount, 0.0)
            } else {
                (0.0, transaction.amount)
            };
            total_income += income;
            total_expense += expense;
            running_balance += income - expense;

            canvas.text(
                &calendar::format_date(transaction.date, calendar_system)?,
                8.5,
                25.0,
                canvas.y,
                false,
                TEXT_SECONDARY,
            );
            let account = lookup_name(accounts.iter().map(|a| (&a.id, &a.name)), &transaction.account);
            canvas.text(&truncate(&account, 15), 8.5, 50.0, canvas.y, false, TEXT_SECONDARY);
            let category =
                lookup_name(categories.iter().map(|c| (&c.id, &c.name)), &transaction.category);
            canvas.text(&truncate(&category, 15), 8.5, 82.0, canvas.y, false, TEXT_SECONDARY);
            canvas.text(
                &dash_or_amount(currency, income),
                8.5,
                115.0,
                canvas.y,
                income > 0.0,
                SUCCESS,
            );
            canvas.text(
                &dash_or_amount(currency, expense),
                8.5,
                140.0,
                canvas.y,
                expense > 0.0,
                DANGER,
            );
            canvas.text(
                &signed_amount(currency, running_balance),
                8.5,
                165.0,
                canvas.y,
                true,
                TEXT_PRIMARY,
            );
            canvas.y += 7.0;
        }

        if canvas.ensure_space(10.0) {
            canvas.table_header(&columns);
        }
        canvas.fill_rect(MARGIN, canvas.y - 4.5, PAGE_WIDTH - 40.0, 8.0, BG_DARK);
        canvas.text("TOTAL", 10.0, 82.0, canvas.y, true, TEXT_PRIMARY);
        canvas.text(
            &format!("{currency} {}", format_number(total_income)),
            10.0,
            115.0,
            canvas.y,
            true,
            SUCCESS,
        );
        canvas.text(
            &format!("{currency} {}", format_number(total_expense)),
            10.0,
            140.0,
            canvas.y,
            true,
            DANGER,
        );
        canvas.text(
            &signed_amount(currency, total_income - total_expense),
            10.0,
            165.0,
            canvas.y,
            true,
            TEXT_PRIMARY,
        );
        canvas.y += 14.0;
        Ok(())
    }

    fn draw_footer(&self, canvas: &mut PdfCanvas) {
        canvas.text_center(
            "This report was auto-generated by Nepali Wallet",
            8.0,
            PAGE_WIDTH / 2.0,
            PAGE_HEIGHT - 10.0,
            false,
            TEXT_MUTED,
        );
    }
}

impl Default for ReportService {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep the transactions of the requested year (and month, for monthly
/// reports) under the selected calendar, sorted ascending by date.
pub fn filter_for_period(
    transactions: &[Transaction],
    query: &ReportQuery,
) -> Result<Vec<Transaction>> {
    let mut filtered = Vec::new();
    for transaction in transactions {
        let (year, month) = calendar::year_month(transaction.date, query.calendar)?;
        if year != query.year {
            continue;
        }
        if query.period == ReportPeriod::Monthly && query.month.is_some_and(|m| m != month) {
            continue;
        }
        filtered.push(transaction.clone());
    }
    filtered.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    Ok(filtered)
}

/// Sum per category for one side of the ledger, sorted descending by amount.
/// Dangling category ids keep their raw id as the display name.
pub fn category_totals(
    transactions: &[Transaction],
    transaction_type: TransactionType,
    categories: &[Category],
) -> Vec<CategoryTotal> {
    let mut totals: Vec<(String, f64)> = Vec::new();
    for transaction in transactions
        .iter()
        .filter(|t| t.transaction_type == transaction_type)
    {
        match totals.iter_mut().find(|(id, _)| id == &transaction.category) {
            Some((_, amount)) => *amount += transaction.amount,
            None => totals.push((transaction.category.clone(), transaction.amount)),
        }
    }
    let mut result: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(id, amount)| CategoryTotal {
            name: lookup_name(categories.iter().map(|c| (&c.id, &c.name)), &id),
            amount,
        })
        .collect();
    result.sort_by(|a, b| b.amount.partial_cmp(&a.amount).unwrap_or(std::cmp::Ordering::Equal));
    result
}

/// Bucket transactions into the twelve months of the selected calendar.
pub fn monthly_totals(
    transactions: &[Transaction],
    calendar_system: CalendarSystem,
) -> Result<Vec<MonthTotal>> {
    let names = calendar::month_names(calendar_system);
    let mut months: Vec<MonthTotal> = names
        .iter()
        .map(|name| MonthTotal {
            month: name,
            income: 0.0,
            expenses: 0.0,
        })
        .collect();

    for transaction in transactions {
        let (_, month) = calendar::year_month(transaction.date, calendar_system)?;
        let bucket = &mut months[(month - 1) as usize];
        match transaction.transaction_type {
            TransactionType::Income => bucket.income += transaction.amount,
            TransactionType::Expense => bucket.expenses += transaction.amount,
        }
    }
    Ok(months)
}

/// Per-account income/expense/balance rows, one per known account.
pub fn account_rows(accounts: &[Account], transactions: &[Transaction]) -> Vec<AccountRow> {
    accounts
        .iter()
        .map(|account| {
            let mut income = 0.0;
            let mut expense = 0.0;
            for transaction in transactions.iter().filter(|t| t.account == account.id) {
                match transaction.transaction_type {
                    TransactionType::Income => income += transaction.amount,
                    TransactionType::Expense => expense += transaction.amount,
                }
            }
            AccountRow {
                name: account.name.clone(),
                income,
                expense,
                balance: income - expense,
            }
        })
        .collect()
}

/// Savings rate in percent; `None` when there is no income to save from.
pub fn savings_rate(total_income: f64, total_expenses: f64) -> Option<f64> {
    if total_income > 0.0 {
        Some((total_income - total_expenses) / total_income * 100.0)
    } else {
        None
    }
}

/// `1234567.5` -> `1,234,567.5`: thousands separators, at most two decimal
/// places, trailing zeros trimmed.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let negative = rounded < 0.0;
    let abs = rounded.abs();
    let mut int_part = abs.trunc() as u64;
    let mut cents = ((abs - abs.trunc()) * 100.0).round() as u64;
    if cents >= 100 {
        int_part += 1;
        cents = 0;
    }

    let digits = int_part.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let mut result = String::new();
    if negative {
        result.push('-');
    }
    result.push_str(&grouped);
    if cents > 0 {
        if cents % 10 == 0 {
            result.push_str(&format!(".{}", cents / 10));
        } else {
            result.push_str(&format!(".{cents:02}"));
        }
    }
    result
}

fn report_filename(query: &ReportQuery, generated_at: chrono::DateTime<Local>) -> String {
    let month_tag = match (query.period, query.month) {
        (ReportPeriod::Monthly, Some(month)) => {
            format!("{}-", calendar::month_name(month, query.calendar))
        }
        _ => String::new(),
    };
    let stamp = generated_at.format("exported-%Y-%m-%d_%H-%M-%S");
    format!(
        "financial-report-{}{}{}-{}.pdf",
        month_tag,
        query.year,
        query.calendar.label(),
        stamp
    )
}

fn dash_or_amount(currency: &str, amount: f64) -> String {
    if amount > 0.0 {
        format!("{currency} {}", format_number(amount))
    } else {
        "-".to_string()
    }
}

fn signed_amount(currency: &str, amount: f64) -> String {
    format!(
        "{} {currency} {}",
        if amount >= 0.0 { "+" } else { "-" },
        format_number(amount.abs())
    )
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

fn lookup_name<'a>(
    mut pairs: impl Iterator<Item = (&'a String, &'a String)>,
    id: &str,
) -> String {
    pairs
        .find(|(candidate, _)| candidate.as_str() == id)
        .map(|(_, name)| name.clone())
        .unwrap_or_else(|| id.to_string())
}

/// Drawing surface with a top-down cursor over printpdf's bottom-up
/// coordinates. Font metrics for the built-in Helvetica are approximated for
/// right/center alignment.
struct PdfCanvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Cursor position in mm from the top of the page.
    y: f64,
    pages: usize,
}

impl PdfCanvas {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .context("failed to load built-in font")?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .context("failed to load built-in font")?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: 25.0,
            pages: 1,
        })
    }

    fn break_page(&mut self) {
        let (page, layer) =
            self.doc
                .add_page(Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = 25.0;
        self.pages += 1;
    }

    /// Break the page when fewer than `needed` mm remain. Returns whether a
    /// break happened so tables can redraw their header row.
    fn ensure_space(&mut self, needed: f64) -> bool {
        if self.y + needed > PAGE_HEIGHT - MARGIN {
            self.break_page();
            true
        } else {
            false
        }
    }

    fn color(&self, (r, g, b): (u8, u8, u8)) -> Color {
        Color::Rgb(Rgb::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            None,
        ))
    }

    fn text(&self, text: &str, size: f64, x: f64, y_top: f64, bold: bool, color: (u8, u8, u8)) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.set_fill_color(self.color(color));
        self.layer
            .use_text(text, size as f32, Mm(x as f32), Mm((PAGE_HEIGHT - y_top) as f32), font);
    }

    fn text_right(
        &self,
        text: &str,
        size: f64,
        x_right: f64,
        y_top: f64,
        bold: bool,
        color: (u8, u8, u8),
    ) {
        let width = estimate_text_width(text, size);
        self.text(text, size, x_right - width, y_top, bold, color);
    }

    fn text_center(
        &self,
        text: &str,
        size: f64,
        x_center: f64,
        y_top: f64,
        bold: bool,
        color: (u8, u8, u8),
    ) {
        let width = estimate_text_width(text, size);
        self.text(text, size, x_center - width / 2.0, y_top, bold, color);
    }

    fn fill_rect(&self, x: f64, y_top: f64, width: f64, height: f64, color: (u8, u8, u8)) {
        self.layer.set_fill_color(self.color(color));
        let rect = Rect::new(
            Mm(x as f32),
            Mm((PAGE_HEIGHT - y_top - height) as f32),
            Mm((x + width) as f32),
            Mm((PAGE_HEIGHT - y_top) as f32),
        )
        .with_mode(PaintMode::Fill);
        self.layer.add_rect(rect);
    }

    fn line(&self, x1: f64, y1_top: f64, x2: f64, y2_top: f64, color: (u8, u8, u8)) {
        self.layer.set_outline_color(self.color(color));
        self.layer.set_outline_thickness(0.5);
        let line = Line {
            points: vec![
                (Point::new(Mm(x1 as f32), Mm((PAGE_HEIGHT - y1_top) as f32)), false),
                (Point::new(Mm(x2 as f32), Mm((PAGE_HEIGHT - y2_top) as f32)), false),
            ],
            is_closed: false,
        };
        self.layer.add_line(line);
    }

    /// A white card with a light border, the layout block everything else
    /// sits on.
    fn card(&self, x: f64, y_top: f64, width: f64, height: f64) {
        self.fill_rect(x + 0.7, y_top + 0.7, width, height, (200, 200, 200));
        self.layer.set_outline_color(self.color(BORDER));
        self.layer.set_outline_thickness(0.5);
        self.layer.set_fill_color(self.color((255, 255, 255)));
        let rect = Rect::new(
            Mm(x as f32),
            Mm((PAGE_HEIGHT - y_top - height) as f32),
            Mm((x + width) as f32),
            Mm((PAGE_HEIGHT - y_top) as f32),
        )
        .with_mode(PaintMode::FillStroke);
        self.layer.add_rect(rect);
    }

    fn divider(&self) {
        self.line(MARGIN, self.y, PAGE_WIDTH - MARGIN, self.y, BORDER);
    }

    fn section_header(&mut self, title: &str) {
        self.text(title, 16.0, MARGIN, self.y, true, TEXT_PRIMARY);
        self.y += 3.0;
        self.divider();
        self.y += 10.0;
    }

    /// Shaded table header row at the cursor; advances the cursor past it.
    fn table_header(&mut self, columns: &[(&str, f64)]) {
        self.fill_rect(MARGIN, self.y - 4.5, PAGE_WIDTH - 40.0, 8.0, BG_DARK);
        for (label, x) in columns {
            self.text(label, 10.0, *x, self.y, true, TEXT_PRIMARY);
        }
        self.y += 9.0;
    }
}

/// Rough Helvetica advance: average glyph width of ~half the font size.
/// Good enough for right/center alignment of short labels.
fn estimate_text_width(text: &str, size: f64) -> f64 {
    const PT_TO_MM: f64 = 0.352_778;
    text.chars().count() as f64 * size * 0.5 * PT_TO_MM
}
