//! Derived summaries over record rows: current earnings, goal progress and
//! budget utilization.
//!
//! Everything here is a pure function of its inputs. Amounts are summed as
//! minor units in an `i128` accumulator, so hundreds of small rows never drift
//! and never overflow; a missing amount counts as zero.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{BudgetCategory, Currency, Goal, Income, Money, Record, Transaction};

fn total<T>(amounts: T) -> i128
where
    T: IntoIterator<Item = Option<Money>>,
{
    amounts
        .into_iter()
        .map(|amount| i128::from(amount.unwrap_or(Money::ZERO).minor()))
        .sum()
}

/// Money currently available and not yet committed to a goal:
/// `max(0, Σ incomes − Σ expenses − Σ goal contributions)`.
///
/// The three inputs must share one currency; `expenses` must already exclude
/// income-type transactions. See [`EarningsSnapshot::by_currency`] for the
/// record-level entry point that does both.
///
/// ```rust
/// use engine::{Money, current_earnings};
///
/// let earned = current_earnings(
///     [Some(Money::new(1000))],
///     [Some(Money::new(300))],
///     [Some(Money::new(200))],
/// );
/// assert_eq!(earned, Money::new(500));
/// ```
pub fn current_earnings<I, E, G>(incomes: I, expenses: E, goals: G) -> Money
where
    I: IntoIterator<Item = Option<Money>>,
    E: IntoIterator<Item = Option<Money>>,
    G: IntoIterator<Item = Option<Money>>,
{
    let available = total(incomes) - total(expenses) - total(goals);
    Money::saturating_from_i128(available.max(0))
}

/// Earnings figures for a single currency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EarningsSnapshot {
    pub currency: Currency,
    pub income: Money,
    pub expense: Money,
    pub goal_contributions: Money,
    /// Clamped at zero.
    pub available: Money,
}

#[derive(Default)]
struct Buckets {
    incomes: Vec<Option<Money>>,
    expenses: Vec<Option<Money>>,
    goals: Vec<Option<Money>>,
}

impl EarningsSnapshot {
    /// One snapshot per currency present in the input, ordered by currency.
    ///
    /// Income-type transactions are skipped: income is counted from the
    /// dedicated income rows only.
    pub fn by_currency<'a>(
        incomes: impl IntoIterator<Item = &'a Income>,
        transactions: impl IntoIterator<Item = &'a Transaction>,
        goals: impl IntoIterator<Item = &'a Goal>,
    ) -> Vec<EarningsSnapshot> {
        let mut buckets: BTreeMap<Currency, Buckets> = BTreeMap::new();
        for income in incomes {
            buckets
                .entry(income.currency)
                .or_default()
                .incomes
                .push(income.amount_minor);
        }
        for tx in transactions.into_iter().filter(|tx| tx.is_expense()) {
            buckets
                .entry(tx.currency)
                .or_default()
                .expenses
                .push(tx.amount_minor);
        }
        for goal in goals {
            buckets
                .entry(goal.currency)
                .or_default()
                .goals
                .push(goal.current_minor);
        }

        buckets
            .into_iter()
            .map(|(currency, rows)| EarningsSnapshot {
                currency,
                income: Money::saturating_from_i128(total(rows.incomes.iter().copied())),
                expense: Money::saturating_from_i128(total(rows.expenses.iter().copied())),
                goal_contributions: Money::saturating_from_i128(total(rows.goals.iter().copied())),
                available: current_earnings(rows.incomes, rows.expenses, rows.goals),
            })
            .collect()
    }
}

/// Share of a goal's target already saved, as a percentage in `0..=100`.
///
/// Returns 0 when the target is missing or not positive.
pub fn goal_progress(goal: &Goal) -> u8 {
    let target = i128::from(goal.target_minor.unwrap_or(Money::ZERO).minor());
    if target <= 0 {
        return 0;
    }
    let current = i128::from(goal.current_minor.unwrap_or(Money::ZERO).minor());
    let percent = (current * 100 / target).clamp(0, 100);
    u8::try_from(percent).unwrap_or(100)
}

/// Share of a budget category's limit spent by expense transactions filed
/// under it (same currency), as a percentage.
///
/// Not capped at 100 so overspending shows. Returns 0 when the limit is
/// missing or not positive.
pub fn budget_utilization<'a>(
    category: &Record<BudgetCategory>,
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> u32 {
    let limit = i128::from(category.payload.limit_minor.unwrap_or(Money::ZERO).minor());
    if limit <= 0 {
        return 0;
    }
    let spent = total(
        transactions
            .into_iter()
            .filter(|tx| tx.is_expense())
            .filter(|tx| tx.currency == category.payload.currency)
            .filter(|tx| tx.category_id.as_deref() == Some(category.id.as_str()))
            .map(|tx| tx.amount_minor),
    );
    let percent = (spent * 100 / limit).max(0);
    u32::try_from(percent).unwrap_or(u32::MAX)
}
