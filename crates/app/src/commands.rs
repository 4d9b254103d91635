use std::sync::Arc;

use chrono::NaiveDate;
use engine::{
    BudgetCategory, BudgetPeriod, ConnectivitySignal, Currency, EarningsSnapshot, Goal, Income,
    Money, Record, RecordId, RecordKind, SkipReason, SqliteStore, SweepOutcome, SyncManager,
    SyncScheduler, Transaction, TransactionKind, budget_utilization, goal_progress,
};
use migration::MigratorTrait;
use remote::{HttpProbe, HttpRemote};
use tokio::sync::watch;

use crate::{
    cli::{
        AssetAddArgs, AssetCommand, BudgetAddArgs, BudgetCommand, Command, ExpenseAddArgs,
        ExpenseCommand, GoalAddArgs, GoalCommand, IncomeAddArgs, IncomeCommand, ListKind,
    },
    error::{AppError, Result},
    settings::Settings,
};

/// Wired collaborators for one invocation.
pub struct App {
    settings: Settings,
    manager: Arc<SyncManager>,
    signal: Arc<ConnectivitySignal>,
    probe: HttpProbe,
}

impl App {
    pub async fn connect(settings: Settings) -> Result<Self> {
        let db = sea_orm::Database::connect(&settings.database_url).await?;
        migration::Migrator::up(&db, None).await?;

        let remote = HttpRemote::new(
            &settings.base_url,
            settings.api_token.as_deref(),
            settings.remote_timeout(),
        )?;
        let probe = HttpProbe::new(&settings.base_url, settings.remote_timeout())?;
        let signal = Arc::new(ConnectivitySignal::new(false));

        let manager = SyncManager::builder()
            .local_store(Arc::new(SqliteStore::new(db)))
            .remote_store(Arc::new(remote))
            .connectivity(signal.clone())
            .remote_timeout(settings.remote_timeout())
            .build()?;

        Ok(Self {
            settings,
            manager: Arc::new(manager),
            signal,
            probe,
        })
    }

    pub async fn run(self, command: Command) -> Result<()> {
        if command.needs_remote() {
            self.signal.set_online(self.probe.check().await);
            if !self.manager.is_online() {
                tracing::info!("remote store unreachable, working offline");
            }
        }

        match command {
            Command::Income(income) => match income.command {
                IncomeCommand::Add(args) => self.add_income(args).await,
            },
            Command::Expense(expense) => match expense.command {
                ExpenseCommand::Add(args) => self.add_expense(args).await,
            },
            Command::Asset(asset) => match asset.command {
                AssetCommand::Add(args) => self.add_asset(args).await,
            },
            Command::Goal(goal) => match goal.command {
                GoalCommand::Add(args) => self.add_goal(args).await,
            },
            Command::Budget(budget) => match budget.command {
                BudgetCommand::Add(args) => self.add_budget(args).await,
            },
            Command::List(args) => self.list(args.kind).await,
            Command::Earnings => self.earnings().await,
            Command::Status => self.status().await,
            Command::Sync => self.sync().await,
            Command::Retry => {
                let moved = self.manager.retry_failed().await?;
                println!("queued {moved} failed record(s) for retry");
                Ok(())
            }
            Command::Cleanup => {
                let removed = self.manager.cleanup_synced().await?;
                println!("removed {removed} synced record(s)");
                Ok(())
            }
            Command::Watch => self.watch().await,
        }
    }

    fn currency(&self, raw: Option<&str>) -> Result<Currency> {
        match raw {
            Some(code) => Ok(code.parse()?),
            None => self.settings.default_currency(),
        }
    }

    async fn add_income(&self, args: IncomeAddArgs) -> Result<()> {
        let currency = self.currency(args.currency.as_deref())?;
        let income = Income {
            owner: self.settings.owner()?.to_string(),
            source: args.source,
            amount_minor: Some(positive_amount(&args.amount, currency)?),
            currency,
            received_on: args.date.as_deref().map(parse_date).transpose()?,
            note: args.note,
        };
        let id = self.manager.create(income).await?;
        report_created(RecordKind::Income, &id);
        Ok(())
    }

    async fn add_expense(&self, args: ExpenseAddArgs) -> Result<()> {
        let currency = self.currency(args.currency.as_deref())?;
        let kind = if args.income {
            TransactionKind::Income
        } else {
            TransactionKind::Expense
        };
        let transaction = Transaction {
            owner: self.settings.owner()?.to_string(),
            kind,
            amount_minor: Some(positive_amount(&args.amount, currency)?),
            currency,
            category_id: args.category,
            description: args.description,
            occurred_on: args.date.as_deref().map(parse_date).transpose()?,
        };
        let id = self.manager.create(transaction).await?;
        report_created(RecordKind::Transaction, &id);
        Ok(())
    }

    async fn add_asset(&self, args: AssetAddArgs) -> Result<()> {
        let currency = self.currency(args.currency.as_deref())?;
        let asset = engine::Asset {
            owner: self.settings.owner()?.to_string(),
            name: args.name,
            asset_type: args.asset_type,
            value_minor: args
                .value
                .as_deref()
                .map(|raw| non_negative_amount(raw, currency))
                .transpose()?,
            currency,
        };
        let id = self.manager.create(asset).await?;
        report_created(RecordKind::Asset, &id);
        Ok(())
    }

    async fn add_goal(&self, args: GoalAddArgs) -> Result<()> {
        let currency = self.currency(args.currency.as_deref())?;
        let goal = Goal {
            owner: self.settings.owner()?.to_string(),
            name: args.name,
            target_minor: Some(positive_amount(&args.target, currency)?),
            current_minor: args
                .current
                .as_deref()
                .map(|raw| non_negative_amount(raw, currency))
                .transpose()?,
            currency,
            deadline: args.deadline.as_deref().map(parse_date).transpose()?,
        };
        let id = self.manager.create(goal).await?;
        report_created(RecordKind::Goal, &id);
        Ok(())
    }

    async fn add_budget(&self, args: BudgetAddArgs) -> Result<()> {
        let currency = self.currency(args.currency.as_deref())?;
        let category = BudgetCategory {
            owner: self.settings.owner()?.to_string(),
            name: args.name,
            limit_minor: Some(positive_amount(&args.limit, currency)?),
            currency,
            period: BudgetPeriod::try_from(args.period.as_str())?,
        };
        let id = self.manager.create(category).await?;
        report_created(RecordKind::BudgetCategory, &id);
        Ok(())
    }

    async fn list(&self, kind: ListKind) -> Result<()> {
        let owner = self.settings.owner()?;
        match kind {
            ListKind::Income => {
                for record in self.manager.list::<Income>(owner).await? {
                    let income = &record.payload;
                    println!(
                        "{} {}",
                        header(&record),
                        display_amount(income.amount_minor, income.currency)
                    );
                }
            }
            ListKind::Transaction => {
                for record in self.manager.list::<Transaction>(owner).await? {
                    let tx = &record.payload;
                    println!(
                        "{} {} {} {}",
                        header(&record),
                        tx.kind.as_str(),
                        display_amount(tx.amount_minor, tx.currency),
                        tx.description.as_deref().unwrap_or_default()
                    );
                }
            }
            ListKind::Asset => {
                for record in self.manager.list::<engine::Asset>(owner).await? {
                    let asset = &record.payload;
                    println!(
                        "{} {} {}",
                        header(&record),
                        asset.name,
                        display_amount(asset.value_minor, asset.currency)
                    );
                }
            }
            ListKind::Goal => {
                for record in self.manager.list::<Goal>(owner).await? {
                    let goal = &record.payload;
                    println!(
                        "{} {} {} / {} ({}%)",
                        header(&record),
                        goal.name,
                        display_amount(goal.current_minor, goal.currency),
                        display_amount(goal.target_minor, goal.currency),
                        goal_progress(goal)
                    );
                }
            }
            ListKind::BudgetCategory => {
                let transactions = self.manager.list::<Transaction>(owner).await?;
                for record in self.manager.list::<BudgetCategory>(owner).await? {
                    let used =
                        budget_utilization(&record, transactions.iter().map(|r| &r.payload));
                    let category = &record.payload;
                    println!(
                        "{} {} {} {} ({used}% used)",
                        header(&record),
                        category.name,
                        display_amount(category.limit_minor, category.currency),
                        category.period.as_str()
                    );
                }
            }
        }
        Ok(())
    }

    async fn earnings(&self) -> Result<()> {
        let owner = self.settings.owner()?;
        let incomes = self.manager.list::<Income>(owner).await?;
        let transactions = self.manager.list::<Transaction>(owner).await?;
        let goals = self.manager.list::<Goal>(owner).await?;

        let snapshots = EarningsSnapshot::by_currency(
            incomes.iter().map(|r| &r.payload),
            transactions.iter().map(|r| &r.payload),
            goals.iter().map(|r| &r.payload),
        );
        if snapshots.is_empty() {
            println!("available: {}", Money::ZERO.format(self.settings.default_currency()?));
        }
        for snapshot in snapshots {
            let c = snapshot.currency;
            println!(
                "available: {} (income {}, expenses {}, goals {})",
                snapshot.available.format(c),
                snapshot.income.format(c),
                snapshot.expense.format(c),
                snapshot.goal_contributions.format(c)
            );
        }
        Ok(())
    }

    async fn status(&self) -> Result<()> {
        let counts = self.manager.sync_status().await?;
        println!(
            "pending: {}, failed: {}, synced: {}",
            counts.pending, counts.failed, counts.synced
        );
        for record in self.manager.failures().await? {
            println!(
                "  {} {} failed: {}",
                record.kind.as_str(),
                record.id,
                record.last_error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(())
    }

    async fn sync(&self) -> Result<()> {
        match self.manager.sync_pending().await? {
            SweepOutcome::Completed(report) => println!(
                "synced {} of {} record(s), {} failed, {} local record(s) cleaned up",
                report.synced, report.attempted, report.failed, report.cleaned
            ),
            SweepOutcome::Skipped(SkipReason::Offline) => {
                println!("offline: nothing was synced")
            }
            SweepOutcome::Skipped(SkipReason::AlreadyRunning) => {
                println!("a sync is already running")
            }
        }
        Ok(())
    }

    async fn watch(&self) -> Result<()> {
        let (stop_tx, stop_rx) = watch::channel(());
        let scheduler = SyncScheduler::new(
            self.manager.clone(),
            &*self.signal,
            self.settings.sync_interval(),
        );
        tracing::info!(
            "watching {} (probe every {:?}, sync every {:?})",
            self.settings.base_url,
            self.settings.probe_interval(),
            self.settings.sync_interval()
        );

        let probe = self.probe.run(
            &self.signal,
            self.settings.probe_interval(),
            stopped(stop_rx.clone()),
        );
        let sync = scheduler.run(stopped(stop_rx));
        let ctrl_c = async move {
            let result = tokio::signal::ctrl_c().await;
            let _ = stop_tx.send(());
            result
        };

        let ((), (), interrupted) = tokio::join!(probe, sync, ctrl_c);
        interrupted?;
        Ok(())
    }
}

async fn stopped(mut rx: watch::Receiver<()>) {
    let _ = rx.changed().await;
}

fn report_created(kind: RecordKind, id: &RecordId) {
    if id.is_temporary() {
        println!("saved {} {id} locally, pending sync", kind.as_str());
    } else {
        println!("created {} {id}", kind.as_str());
    }
}

fn header<P>(record: &Record<P>) -> String {
    format!(
        "{} {} [{}]",
        record.created_at.format("%Y-%m-%d"),
        record.id,
        record.sync_status.as_str()
    )
}

fn display_amount(amount: Option<Money>, currency: Currency) -> String {
    amount.unwrap_or(Money::ZERO).format(currency)
}

fn positive_amount(raw: &str, currency: Currency) -> Result<Money> {
    let amount = Money::parse(raw, currency)?;
    if !amount.is_positive() {
        return Err(AppError::Input(format!("amount must be positive: {raw}")));
    }
    Ok(amount)
}

fn non_negative_amount(raw: &str, currency: Currency) -> Result<Money> {
    let amount = Money::parse(raw, currency)?;
    if amount.is_negative() {
        return Err(AppError::Input(format!("amount must not be negative: {raw}")));
    }
    Ok(amount)
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| AppError::Input(format!("invalid date {raw}: {err}")))
}
