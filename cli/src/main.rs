//! Command-line frontend for the Nepali Wallet backend.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use nepali_wallet::backend::domain::calendar;
use nepali_wallet::backend::domain::commands::reports::{
    ExportFormat, ExportQuery, ReportPeriod, ReportQuery,
};
use nepali_wallet::backend::domain::commands::transactions::{
    CreateTransactionCommand, TransactionListQuery, UpdateTransactionCommand,
};
use nepali_wallet::backend::storage::JsonConnection;
use nepali_wallet::backend::sync::SyncConfig;
use nepali_wallet::backend::Backend;
use shared::{
    CalendarSystem, NewAccount, NewCategory, SettingsPatch, TransactionPatch, TransactionType,
};

#[derive(Parser)]
#[command(
    name = "nepali-wallet",
    about = "Local-first expense tracker with cloud backup, dual-calendar dates and CSV/PDF reporting",
    version
)]
struct Cli {
    /// Override the data directory (default: ~/Documents/Nepali Wallet).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CliType {
    Expense,
    Income,
}

impl From<CliType> for TransactionType {
    fn from(value: CliType) -> Self {
        match value {
            CliType::Expense => TransactionType::Expense,
            CliType::Income => TransactionType::Income,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CliCalendar {
    Ad,
    Bs,
}

impl From<CliCalendar> for CalendarSystem {
    fn from(value: CliCalendar) -> Self {
        match value {
            CliCalendar::Ad => CalendarSystem::Ad,
            CliCalendar::Bs => CalendarSystem::Bs,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CliFormat {
    Csv,
    Txt,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CliPeriod {
    Monthly,
    Annual,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a transaction.
    Add {
        #[arg(long = "type", value_enum)]
        transaction_type: CliType,
        #[arg(long)]
        amount: f64,
        /// Category id (see `categories list`).
        #[arg(long)]
        category: String,
        /// Account id (see `accounts list`).
        #[arg(long)]
        account: String,
        #[arg(long)]
        description: String,
        /// Gregorian date (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List transactions, newest first.
    List {
        #[arg(long = "type", value_enum)]
        transaction_type: Option<CliType>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        account: Option<String>,
        /// Match against descriptions.
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        /// 1-based month in the selected calendar.
        #[arg(long)]
        month: Option<u32>,
        #[arg(long, value_enum, default_value = "ad")]
        calendar: CliCalendar,
        /// Oldest first.
        #[arg(long)]
        asc: bool,
    },
    /// Update fields of a transaction.
    Update {
        id: String,
        #[arg(long = "type", value_enum)]
        transaction_type: Option<CliType>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        account: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete a transaction.
    Delete { id: String },
    /// Manage categories.
    Categories {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Show or change settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Export transactions as CSV or TXT.
    Export {
        #[arg(long, value_enum, default_value = "csv")]
        format: CliFormat,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long, value_enum, default_value = "ad")]
        calendar: CliCalendar,
        /// Target directory (default: ~/Documents/NepaliWallet).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a PDF financial report.
    Report {
        #[arg(long, value_enum, default_value = "monthly")]
        period: CliPeriod,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long, value_enum, default_value = "ad")]
        calendar: CliCalendar,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Upload local data to the cloud, or manage sync configuration.
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Overwrite local data with the cloud backup.
    Restore {
        /// Confirm the overwrite; restore is destructive.
        #[arg(long)]
        yes: bool,
    },
    /// Raw JSON backup of the whole aggregate.
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Erase all local data.
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// List categories, built-ins first.
    List {
        #[arg(long = "type", value_enum)]
        transaction_type: Option<CliType>,
    },
    /// Add a custom category.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "📦")]
        icon: String,
        #[arg(long, default_value = "bg-gray-500")]
        color: String,
        #[arg(long = "type", value_enum)]
        transaction_type: CliType,
    },
    /// Delete a custom category.
    Delete {
        id: String,
        /// Also delete every transaction in this category.
        #[arg(long)]
        cascade: bool,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// List accounts, built-ins first.
    List,
    /// Add a custom account.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "💰")]
        icon: String,
    },
    /// Delete a custom account.
    Delete {
        id: String,
        /// Also delete every transaction on this account.
        #[arg(long)]
        cascade: bool,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    Show,
    Set {
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        auto_sync: Option<bool>,
    },
}

#[derive(Subcommand)]
enum SyncCommands {
    /// Show sync state.
    Status,
    /// Configure the remote endpoint and user.
    Setup {
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Write the aggregate as pretty JSON (stdout when no file is given).
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the aggregate with a previously exported file.
    Import {
        file: PathBuf,
        #[arg(long)]
        yes: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn open_backend(data_dir: Option<PathBuf>) -> Result<Backend> {
    match data_dir {
        Some(dir) => Backend::with_connection(JsonConnection::new(dir)?),
        None => Backend::new(),
    }
}

fn run(cli: Cli) -> Result<()> {
    let backend = open_backend(cli.data_dir)?;

    match cli.command {
        Commands::Add {
            transaction_type,
            amount,
            category,
            account,
            description,
            date,
        } => {
            let created = backend
                .transaction_service
                .create_transaction(CreateTransactionCommand {
                    transaction_type: transaction_type.into(),
                    amount,
                    category,
                    account,
                    description,
                    date,
                })?;
            println!(
                "Added {} {} on {} (id {})",
                created.transaction_type, created.amount, created.date, created.id
            );
        }

        Commands::List {
            transaction_type,
            category,
            account,
            search,
            year,
            month,
            calendar,
            asc,
        } => {
            let calendar: CalendarSystem = calendar.into();
            let result = backend
                .transaction_service
                .list_transactions(TransactionListQuery {
                    transaction_type: transaction_type.map(Into::into),
                    category,
                    account,
                    search,
                    year,
                    month,
                    calendar,
                    sort_ascending: asc,
                })?;

            let categories = backend.category_service.all_categories()?;
            let accounts = backend.account_service.accounts()?;
            let category_name = |id: &str| {
                categories
                    .iter()
                    .find(|c| c.id == id)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| id.to_string())
            };
            let account_name = |id: &str| {
                accounts
                    .iter()
                    .find(|a| a.id == id)
                    .map(|a| a.name.clone())
                    .unwrap_or_else(|| id.to_string())
            };

            println!(
                "{:<15} {:<12} {:<8} {:<16} {:<12} {:>12}  {}",
                "ID", "DATE", "TYPE", "CATEGORY", "ACCOUNT", "AMOUNT", "DESCRIPTION"
            );
            for transaction in &result.transactions {
                println!(
                    "{:<15} {:<12} {:<8} {:<16} {:<12} {:>12}  {}",
                    transaction.id,
                    calendar::format_date(transaction.date, calendar)?,
                    transaction.transaction_type.to_string(),
                    category_name(&transaction.category),
                    account_name(&transaction.account),
                    transaction.amount,
                    transaction.description
                );
            }
            println!(
                "\n{} transactions | income {} | expenses {} | balance {}",
                result.transactions.len(),
                result.total_income,
                result.total_expense,
                result.total_income - result.total_expense
            );
        }

        Commands::Update {
            id,
            transaction_type,
            amount,
            category,
            account,
            description,
            date,
        } => {
            let updated = backend
                .transaction_service
                .update_transaction(UpdateTransactionCommand {
                    id: id.clone(),
                    patch: TransactionPatch {
                        transaction_type: transaction_type.map(Into::into),
                        amount,
                        category,
                        account,
                        description,
                        date,
                    },
                })?;
            match updated {
                Some(transaction) => println!("Updated transaction {}", transaction.id),
                None => bail!("no transaction with id {id}"),
            }
        }

        Commands::Delete { id } => {
            if backend.transaction_service.delete_transaction(&id)? {
                println!("Deleted transaction {id}");
            } else {
                bail!("no transaction with id {id}");
            }
        }

        Commands::Categories { command } => run_categories(&backend, command)?,
        Commands::Accounts { command } => run_accounts(&backend, command)?,

        Commands::Settings { command } => match command {
            SettingsCommands::Show => {
                let settings = backend.settings_service.settings()?;
                println!("currency:  {}", settings.currency);
                println!("auto-sync: {}", settings.auto_sync);
            }
            SettingsCommands::Set {
                currency,
                auto_sync,
            } => {
                let settings = backend.settings_service.update(SettingsPatch {
                    currency,
                    auto_sync,
                })?;
                println!(
                    "Settings updated (currency {}, auto-sync {})",
                    settings.currency, settings.auto_sync
                );
            }
        },

        Commands::Export {
            format,
            year,
            month,
            calendar,
            out,
        } => {
            let calendar: CalendarSystem = calendar.into();
            let filtered = backend
                .transaction_service
                .list_transactions(TransactionListQuery {
                    year,
                    month,
                    calendar,
                    ..Default::default()
                })?;
            let categories = backend.category_service.all_categories()?;
            let accounts = backend.account_service.accounts()?;
            let outcome = backend.export_service.export_transactions(
                &filtered.transactions,
                &categories,
                &accounts,
                &ExportQuery {
                    format: match format {
                        CliFormat::Csv => ExportFormat::Csv,
                        CliFormat::Txt => ExportFormat::Txt,
                    },
                    year,
                    month,
                    calendar,
                    output_dir: out,
                },
            )?;
            println!(
                "Exported {} transactions to {}",
                outcome.transaction_count,
                outcome.file_path.display()
            );
        }

        Commands::Report {
            period,
            year,
            month,
            calendar,
            out,
        } => {
            let all = backend
                .transaction_service
                .list_transactions(TransactionListQuery::default())?;
            let categories = backend.category_service.all_categories()?;
            let accounts = backend.account_service.accounts()?;
            let currency = backend.settings_service.currency()?;
            let outcome = backend.report_service.generate_report(
                &all.transactions,
                &accounts,
                &categories,
                &currency,
                &ReportQuery {
                    period: match period {
                        CliPeriod::Monthly => ReportPeriod::Monthly,
                        CliPeriod::Annual => ReportPeriod::Annual,
                    },
                    month,
                    year,
                    calendar: calendar.into(),
                    output_dir: out,
                },
            )?;
            println!(
                "Report with {} transactions ({} pages) written to {}",
                outcome.transaction_count,
                outcome.page_count,
                outcome.file_path.display()
            );
        }

        Commands::Sync { command } => match command {
            None => {
                backend.sync_service.sync_data()?;
                println!("Synced local data to cloud");
            }
            Some(SyncCommands::Status) => {
                let status = backend.sync_service.status();
                println!("online:     {}", status.is_online);
                println!(
                    "last sync:  {}",
                    status
                        .last_sync_time
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string())
                );
                println!(
                    "last error: {}",
                    status.sync_error.unwrap_or_else(|| "none".to_string())
                );
            }
            Some(SyncCommands::Setup { base_url, user_id }) => {
                let mut config = SyncConfig::load_or_default(&backend.data_dir)?;
                if base_url.is_some() {
                    config.base_url = base_url;
                }
                if user_id.is_some() {
                    config.user_id = user_id;
                }
                config.save(&backend.data_dir)?;
                println!(
                    "Sync config saved ({})",
                    if config.is_configured() {
                        "configured"
                    } else {
                        "incomplete"
                    }
                );
            }
        },

        Commands::Restore { yes } => {
            if !yes {
                bail!("restore overwrites all local data; re-run with --yes to confirm");
            }
            backend.sync_service.restore_data()?;
            println!("Restored local data from cloud backup");
        }

        Commands::Backup { command } => match command {
            BackupCommands::Export { out } => {
                let json = backend.store.export_json()?;
                match out {
                    Some(path) => {
                        fs::write(&path, &json)
                            .with_context(|| format!("failed to write {}", path.display()))?;
                        println!("Backup written to {}", path.display());
                    }
                    None => println!("{json}"),
                }
            }
            BackupCommands::Import { file, yes } => {
                if !yes {
                    bail!("import overwrites all local data; re-run with --yes to confirm");
                }
                let json = fs::read_to_string(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?;
                if backend.store.import_json(&json)? {
                    println!("Imported backup from {}", file.display());
                } else {
                    bail!("{} is not a wallet backup", file.display());
                }
            }
        },

        Commands::Clear { yes } => {
            if !yes {
                bail!("this erases all local data; re-run with --yes to confirm");
            }
            backend.store.clear_all_data()?;
            println!("All local data cleared");
        }
    }

    Ok(())
}

fn run_categories(backend: &Backend, command: CategoryCommands) -> Result<()> {
    match command {
        CategoryCommands::List { transaction_type } => {
            let categories = match transaction_type {
                Some(CliType::Expense) => backend.category_service.expense_categories()?,
                Some(CliType::Income) => backend.category_service.income_categories()?,
                None => backend.category_service.all_categories()?,
            };
            for category in categories {
                println!(
                    "{:<20} {:<3} {:<16} {}",
                    category.id, category.icon, category.name, category.category_type
                );
            }
        }
        CategoryCommands::Add {
            name,
            icon,
            color,
            transaction_type,
        } => {
            let created = backend.category_service.add_category(NewCategory {
                name,
                icon,
                color,
                category_type: transaction_type.into(),
            })?;
            println!("Added category {} (id {})", created.name, created.id);
        }
        CategoryCommands::Delete { id, cascade, yes } => {
            if cascade && !yes {
                bail!("cascade deletes every transaction in the category; re-run with --yes");
            }
            if !backend.category_service.delete_category(&id)? {
                bail!("no custom category with id {id} (built-ins cannot be deleted)");
            }
            println!("Deleted category {id}");
            if cascade {
                // Referential integrity is not enforced by the store; this
                // explicit cascade is what keeps transactions from dangling.
                backend.category_service.delete_transactions_by_category(&id)?;
                backend.transaction_service.reload()?;
                println!("Deleted transactions in category {id}");
            } else {
                println!("Transactions in this category keep the raw id {id}");
            }
        }
    }
    Ok(())
}

fn run_accounts(backend: &Backend, command: AccountCommands) -> Result<()> {
    match command {
        AccountCommands::List => {
            for account in backend.account_service.accounts()? {
                println!("{:<20} {:<3} {}", account.id, account.icon, account.name);
            }
        }
        AccountCommands::Add { name, icon } => {
            let created = backend
                .account_service
                .add_account(NewAccount { name, icon })?;
            println!("Added account {} (id {})", created.name, created.id);
        }
        AccountCommands::Delete { id, cascade, yes } => {
            if cascade && !yes {
                bail!("cascade deletes every transaction on the account; re-run with --yes");
            }
            if !backend.account_service.delete_account(&id)? {
                bail!("no custom account with id {id} (built-ins cannot be deleted)");
            }
            println!("Deleted account {id}");
            if cascade {
                backend.account_service.delete_transactions_by_account(&id)?;
                backend.transaction_service.reload()?;
                println!("Deleted transactions on account {id}");
            } else {
                println!("Transactions on this account keep the raw id {id}");
            }
        }
    }
    Ok(())
}
