//! Decides what an authenticated user may see.
//!
//! The [AccessPolicy] in [AppState](crate::AppState) is the only place that
//! knows what makes an identity privileged. Handlers ask it through
//! [authorize] and [Scope::for_user] instead of checking user fields themselves.

use std::fmt::Debug;

use rusqlite::{Connection, params};

use crate::{
    Error, User, UserID,
    account::{FinancialAccount, SELECT_ACCOUNTS, map_row_to_account},
};

/// Decides whether an identity may see every account in the system.
pub trait AccessPolicy: Debug + Send + Sync {
    /// Whether `user` is privileged, i.e. may see all accounts and the staff pages.
    fn can_view_all(&self, user: &User) -> bool;
}

/// The default policy: staff users are privileged, everyone else is not.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaffPolicy;

impl AccessPolicy for StaffPolicy {
    fn can_view_all(&self, user: &User) -> bool {
        user.is_staff
    }
}

/// The privilege a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Any authenticated user.
    User,
    /// Only users the policy considers privileged.
    Staff,
}

/// Whether `user` holds `required` under `policy`.
pub fn authorize(policy: &dyn AccessPolicy, user: &User, required: Privilege) -> bool {
    match required {
        Privilege::User => true,
        Privilege::Staff => policy.can_view_all(user),
    }
}

/// The set of accounts an identity may view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every account, ordered by owner username then account type.
    All,
    /// Only the accounts owned by this user, ordered by account type.
    OwnedBy(UserID),
}

/// The scope for `identity`: everything if it is privileged, otherwise its own accounts.
pub fn visible_accounts(identity: UserID, is_privileged: bool) -> Scope {
    if is_privileged {
        Scope::All
    } else {
        Scope::OwnedBy(identity)
    }
}

impl Scope {
    /// The scope `policy` grants to `user`.
    pub fn for_user(policy: &dyn AccessPolicy, user: &User) -> Self {
        visible_accounts(user.id, policy.can_view_all(user))
    }

    /// Fetch the accounts in this scope.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the query fails.
    pub fn load(&self, connection: &Connection) -> Result<Vec<FinancialAccount>, Error> {
        match self {
            Scope::All => connection
                .prepare(&format!(
                    "{SELECT_ACCOUNTS} ORDER BY u.username ASC, a.account_type ASC, a.id ASC"
                ))?
                .query_map([], map_row_to_account)?
                .map(|account| account.map_err(Error::from))
                .collect(),
            Scope::OwnedBy(owner) => connection
                .prepare(&format!(
                    "{SELECT_ACCOUNTS} WHERE a.owner_id = ?1 ORDER BY a.account_type ASC, a.id ASC"
                ))?
                .query_map(params![owner.as_i64()], map_row_to_account)?
                .map(|account| account.map_err(Error::from))
                .collect(),
        }
    }
}
