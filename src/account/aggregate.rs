//! Signed balances and balance totals per user and across the whole system.
//!
//! There are two kinds of totals. Signed totals apply each account's
//! `is_negative` flag and give a user's true financial position. Absolute
//! totals add up the stored magnitudes, ignoring the flag, and come back
//! already formatted as currency strings. Both are computed by the same
//! routine, but they are exposed as separate functions with different return
//! types so that a caller cannot mix signed and unsigned money by accident.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::{UserID, account::FinancialAccount, html::format_currency};

/// The signed balance of `account`: negative when `is_negative` is set.
pub fn actual_balance(account: &FinancialAccount) -> Decimal {
    let balance = account.balance.as_decimal();

    if account.is_negative { -balance } else { balance }
}

/// The balance formatted as currency, e.g. "-$1,234.56" for an overdrawn account.
pub fn display_balance(account: &FinancialAccount) -> String {
    let amount = format_currency(account.balance.as_decimal().abs());

    if account.is_negative {
        format!("-{amount}")
    } else {
        amount
    }
}

/// How each account contributes to a total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignMode {
    /// Use [actual_balance].
    Signed,
    /// Use the stored magnitude, ignoring `is_negative`.
    Absolute,
}

impl SignMode {
    fn amount(self, account: &FinancialAccount) -> Decimal {
        match self {
            SignMode::Signed => actual_balance(account),
            SignMode::Absolute => account.balance.as_decimal(),
        }
    }
}

/// The total balance of one user's accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct UserTotal<T> {
    /// The user the total belongs to.
    pub user_id: UserID,
    /// The user's name, which the totals are ordered by.
    pub username: String,
    /// The sum of the user's balances.
    pub total: T,
}

/// Totals across a set of accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct Totals<T> {
    /// The sum over every account.
    pub system_total: T,
    /// One entry per owner, ordered by username.
    pub user_totals: Vec<UserTotal<T>>,
    /// The total for the user passed to the aggregation, if any.
    ///
    /// Zero if that user owns none of the accounts.
    pub user_total: Option<T>,
}

impl<T> Totals<T> {
    fn map<U>(self, f: impl Fn(T) -> U) -> Totals<U> {
        Totals {
            system_total: f(self.system_total),
            user_totals: self
                .user_totals
                .into_iter()
                .map(|user_total| UserTotal {
                    user_id: user_total.user_id,
                    username: user_total.username,
                    total: f(user_total.total),
                })
                .collect(),
            user_total: self.user_total.map(f),
        }
    }
}

/// Zero with two fraction digits so that empty totals display as "0.00".
fn zero() -> Decimal {
    Decimal::new(0, 2)
}

fn aggregate(
    accounts: &[FinancialAccount],
    mode: SignMode,
    for_user: Option<UserID>,
) -> Totals<Decimal> {
    let mut system_total = zero();
    let mut per_user: BTreeMap<(&str, UserID), Decimal> = BTreeMap::new();

    for account in accounts {
        let amount = mode.amount(account);
        system_total += amount;
        *per_user
            .entry((account.owner_username.as_str(), account.owner))
            .or_insert_with(zero) += amount;
    }

    let user_total = for_user.map(|user_id| {
        per_user
            .iter()
            .find(|((_, owner), _)| *owner == user_id)
            .map(|(_, total)| *total)
            .unwrap_or_else(zero)
    });

    let user_totals = per_user
        .into_iter()
        .map(|((username, user_id), total)| UserTotal {
            user_id,
            username: username.to_owned(),
            total,
        })
        .collect();

    Totals {
        system_total,
        user_totals,
        user_total,
    }
}

/// Sum the signed balances of `accounts`, overall and per owner.
///
/// If `for_user` is given, [Totals::user_total] holds that user's signed total.
pub fn totals_signed(accounts: &[FinancialAccount], for_user: Option<UserID>) -> Totals<Decimal> {
    aggregate(accounts, SignMode::Signed, for_user)
}

/// Sum the balance magnitudes of `accounts`, ignoring `is_negative`, and
/// format every total as currency.
///
/// If `for_user` is given, [Totals::user_total] holds that user's total.
pub fn totals_absolute(accounts: &[FinancialAccount], for_user: Option<UserID>) -> Totals<String> {
    aggregate(accounts, SignMode::Absolute, for_user).map(format_currency)
}
