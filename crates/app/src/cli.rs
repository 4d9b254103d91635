use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::settings::Overrides;

#[derive(Parser, Debug)]
#[command(name = "fintrack", version)]
#[command(about = "Offline-first personal finance tracker")]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Income(Income),
    Expense(Expense),
    Asset(Asset),
    Goal(Goal),
    Budget(Budget),
    /// List records of one kind, newest first.
    List(ListArgs),
    /// Money currently available, one line per currency.
    Earnings,
    /// Local record counts per sync status.
    Status,
    /// Push pending records to the remote store now.
    Sync,
    /// Queue failed records for the next sync.
    Retry,
    /// Remove local copies of synced records.
    Cleanup,
    /// Keep probing connectivity and syncing until Ctrl-C.
    Watch,
}

impl Command {
    /// Commands that never talk to the remote store skip the startup probe.
    pub fn needs_remote(&self) -> bool {
        !matches!(self, Command::Status | Command::Retry | Command::Cleanup)
    }
}

#[derive(Args, Debug)]
pub struct Income {
    #[command(subcommand)]
    pub command: IncomeCommand,
}

#[derive(Subcommand, Debug)]
pub enum IncomeCommand {
    Add(IncomeAddArgs),
}

#[derive(Args, Debug)]
pub struct IncomeAddArgs {
    /// Amount in major units (e.g. 1250.00).
    #[arg(long)]
    pub amount: String,
    #[arg(long)]
    pub currency: Option<String>,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub note: Option<String>,
    /// Date received (YYYY-MM-DD).
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args, Debug)]
pub struct Expense {
    #[command(subcommand)]
    pub command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
pub enum ExpenseCommand {
    Add(ExpenseAddArgs),
}

#[derive(Args, Debug)]
pub struct ExpenseAddArgs {
    #[arg(long)]
    pub amount: String,
    #[arg(long)]
    pub currency: Option<String>,
    /// Budget category id the expense is filed under.
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub date: Option<String>,
    /// Record an income-type transaction instead.
    #[arg(long)]
    pub income: bool,
}

#[derive(Args, Debug)]
pub struct Asset {
    #[command(subcommand)]
    pub command: AssetCommand,
}

#[derive(Subcommand, Debug)]
pub enum AssetCommand {
    Add(AssetAddArgs),
}

#[derive(Args, Debug)]
pub struct AssetAddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub value: Option<String>,
    #[arg(long)]
    pub currency: Option<String>,
    #[arg(long)]
    pub asset_type: Option<String>,
}

#[derive(Args, Debug)]
pub struct Goal {
    #[command(subcommand)]
    pub command: GoalCommand,
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    Add(GoalAddArgs),
}

#[derive(Args, Debug)]
pub struct GoalAddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub target: String,
    /// Amount already set aside.
    #[arg(long)]
    pub current: Option<String>,
    #[arg(long)]
    pub currency: Option<String>,
    #[arg(long)]
    pub deadline: Option<String>,
}

#[derive(Args, Debug)]
pub struct Budget {
    #[command(subcommand)]
    pub command: BudgetCommand,
}

#[derive(Subcommand, Debug)]
pub enum BudgetCommand {
    Add(BudgetAddArgs),
}

#[derive(Args, Debug)]
pub struct BudgetAddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub limit: String,
    #[arg(long)]
    pub currency: Option<String>,
    /// weekly, monthly or yearly.
    #[arg(long, default_value = "monthly")]
    pub period: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    pub kind: ListKind,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    Income,
    Transaction,
    Asset,
    Goal,
    #[value(name = "budget_category")]
    BudgetCategory,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_expense_with_global_owner() {
        let cli = Cli::try_parse_from([
            "fintrack",
            "expense",
            "add",
            "--amount",
            "12.50",
            "--category",
            "groceries",
            "--owner",
            "alice",
        ])
        .unwrap();
        let Command::Expense(Expense {
            command: ExpenseCommand::Add(args),
        }) = cli.command
        else {
            panic!("unexpected command");
        };
        assert_eq!(args.amount, "12.50");
        assert_eq!(args.category.as_deref(), Some("groceries"));
        assert!(!args.income);
    }

    #[test]
    fn list_kind_uses_collection_names() {
        let cli = Cli::try_parse_from(["fintrack", "list", "budget_category"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::List(ListArgs {
                kind: ListKind::BudgetCategory
            })
        ));
        assert!(!Command::Status.needs_remote());
    }
}
