//! The financial account record and its database table.

use std::str::FromStr;

use rusqlite::{Connection, Row, params, types::Type};
use rust_decimal::{Decimal, RoundingStrategy};
use time::OffsetDateTime;

use crate::{Error, UserID};

/// The database ID of a financial account.
pub type AccountId = i64;

/// Maximum number of characters in an account type.
pub const ACCOUNT_TYPE_MAX_LENGTH: usize = 255;
/// Maximum number of characters in an account number.
pub const ACCOUNT_NUMBER_MAX_LENGTH: usize = 20;

/// Number of fraction digits kept for money amounts.
const DECIMAL_PLACES: u32 = 2;
/// Total number of digits a balance may have, including the fraction digits.
const MAX_DIGITS: u32 = 12;

/// A non-negative amount of money with two fraction digits.
///
/// Balances are stored as magnitudes; whether the account is overdrawn is
/// recorded separately in [FinancialAccount::is_negative].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Magnitude(Decimal);

impl Magnitude {
    /// Round `amount` to two decimal places (round-half-even) and check that it is
    /// not negative and fits in twelve digits.
    ///
    /// # Errors
    /// Returns [Error::NegativeBalance] or [Error::BalanceTooLarge].
    pub fn new(amount: Decimal) -> Result<Self, Error> {
        let mut amount =
            amount.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven);

        if amount.is_zero() {
            amount = Decimal::ZERO;
        } else if amount.is_sign_negative() {
            return Err(Error::NegativeBalance);
        }

        amount.rescale(DECIMAL_PLACES);

        if amount.mantissa() >= 10_i128.pow(MAX_DIGITS) {
            return Err(Error::BalanceTooLarge(amount.to_string()));
        }

        Ok(Self(amount))
    }

    /// Parse a user supplied amount such as "1234.5".
    ///
    /// # Errors
    /// Returns [Error::InvalidBalance] if `raw` is not a number, otherwise the
    /// errors of [Magnitude::new].
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let amount =
            Decimal::from_str(raw.trim()).map_err(|_| Error::InvalidBalance(raw.to_owned()))?;

        Self::new(amount)
    }

    /// The amount as a decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

/// A bank account, credit card or similar, owned by exactly one user.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialAccount {
    /// The id for the account.
    pub id: AccountId,
    /// The user that owns the account.
    pub owner: UserID,
    /// The owner's username, used for display and for ordering totals.
    pub owner_username: String,
    /// Free text classification, e.g. "checking".
    pub account_type: String,
    /// An optional identifier to show next to the account type.
    pub account_number: Option<String>,
    /// The size of the balance, regardless of sign.
    pub balance: Magnitude,
    /// Whether `balance` should be read as a negative amount.
    pub is_negative: bool,
    /// When the account was last created or updated.
    pub last_updated: OffsetDateTime,
}

impl FinancialAccount {
    /// The account's name as shown in lists, e.g. "alice - checking-1234*".
    ///
    /// The trailing star marks accounts that have an account number.
    pub fn display_name(&self) -> String {
        match &self.account_number {
            Some(number) => format!(
                "{} - {}-{}*",
                self.owner_username, self.account_type, number
            ),
            None => format!("{} - {}", self.owner_username, self.account_type),
        }
    }
}

/// The validated fields needed to create or update an account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    /// The user that owns the account.
    pub owner: UserID,
    /// Free text classification, e.g. "checking".
    pub account_type: String,
    /// An optional identifier to show next to the account type.
    pub account_number: Option<String>,
    /// The size of the balance, regardless of sign.
    pub balance: Magnitude,
    /// Whether `balance` should be read as a negative amount.
    pub is_negative: bool,
}

impl NewAccount {
    /// Trim and check the text fields.
    ///
    /// A blank account number is treated as no account number.
    ///
    /// # Errors
    /// Returns [Error::EmptyAccountType] or [Error::FieldTooLong].
    pub fn new(
        owner: UserID,
        account_type: &str,
        account_number: Option<&str>,
        balance: Magnitude,
        is_negative: bool,
    ) -> Result<Self, Error> {
        let account_type = account_type.trim();

        if account_type.is_empty() {
            return Err(Error::EmptyAccountType);
        }

        if account_type.chars().count() > ACCOUNT_TYPE_MAX_LENGTH {
            return Err(Error::FieldTooLong {
                field: "Account type",
                max_length: ACCOUNT_TYPE_MAX_LENGTH,
            });
        }

        let account_number = account_number
            .map(str::trim)
            .filter(|number| !number.is_empty());

        if let Some(number) = account_number
            && number.chars().count() > ACCOUNT_NUMBER_MAX_LENGTH
        {
            return Err(Error::FieldTooLong {
                field: "Account number",
                max_length: ACCOUNT_NUMBER_MAX_LENGTH,
            });
        }

        Ok(Self {
            owner,
            account_type: account_type.to_owned(),
            account_number: account_number.map(str::to_owned),
            balance,
            is_negative,
        })
    }
}

/// Create the financial account table.
///
/// Balances are stored as text so they round-trip without binary floating point.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS financial_account (
            id INTEGER PRIMARY KEY,
            owner_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            account_type TEXT NOT NULL,
            account_number TEXT,
            balance TEXT NOT NULL,
            is_negative INTEGER NOT NULL DEFAULT 0,
            last_updated TEXT NOT NULL
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_financial_account_owner ON financial_account(owner_id)",
        (),
    )?;

    Ok(())
}

/// The columns expected by [map_row_to_account], joined with the owner's username.
pub(crate) const SELECT_ACCOUNTS: &str = "SELECT a.id, a.owner_id, u.username, a.account_type, \
    a.account_number, a.balance, a.is_negative, a.last_updated \
    FROM financial_account a INNER JOIN user u ON u.id = a.owner_id";

/// Map a row selected with [SELECT_ACCOUNTS] to a [FinancialAccount].
pub fn map_row_to_account(row: &Row) -> Result<FinancialAccount, rusqlite::Error> {
    let raw_balance: String = row.get(5)?;
    let balance = Decimal::from_str(&raw_balance)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(error)))
        .and_then(|amount| {
            Magnitude::new(amount).map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(error))
            })
        })?;

    Ok(FinancialAccount {
        id: row.get(0)?,
        owner: UserID::new(row.get(1)?),
        owner_username: row.get(2)?,
        account_type: row.get(3)?,
        account_number: row.get(4)?,
        balance,
        is_negative: row.get(6)?,
        last_updated: row.get(7)?,
    })
}

/// Insert a new account, stamping it with the current time.
///
/// # Errors
/// Returns [Error::InvalidOwner] if the owner is not a registered user.
pub fn create_account(
    account: &NewAccount,
    connection: &Connection,
) -> Result<FinancialAccount, Error> {
    let last_updated = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO financial_account
            (owner_id, account_type, account_number, balance, is_negative, last_updated)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            account.owner.as_i64(),
            account.account_type,
            account.account_number,
            account.balance.as_decimal().to_string(),
            account.is_negative,
            last_updated,
        ],
    )?;

    get_account(connection.last_insert_rowid(), connection)
}

/// Get the account with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such account.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<FinancialAccount, Error> {
    connection
        .query_row(
            &format!("{SELECT_ACCOUNTS} WHERE a.id = ?1"),
            params![id],
            map_row_to_account,
        )
        .map_err(Error::from)
}

/// Overwrite every field of the account with `id` and refresh its `last_updated` time.
///
/// # Errors
/// Returns [Error::UpdateMissingAccount] if there is no such account or
/// [Error::InvalidOwner] if the new owner is not a registered user.
pub fn update_account(
    id: AccountId,
    account: &NewAccount,
    connection: &Connection,
) -> Result<FinancialAccount, Error> {
    let rows_affected = connection.execute(
        "UPDATE financial_account
        SET owner_id = ?1, account_type = ?2, account_number = ?3, balance = ?4,
            is_negative = ?5, last_updated = ?6
        WHERE id = ?7",
        params![
            account.owner.as_i64(),
            account.account_type,
            account.account_number,
            account.balance.as_decimal().to_string(),
            account.is_negative,
            OffsetDateTime::now_utc(),
            id,
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingAccount);
    }

    get_account(id, connection)
}

/// Delete the account with `id`.
///
/// # Errors
/// Returns [Error::DeleteMissingAccount] if there is no such account.
pub fn delete_account(id: AccountId, connection: &Connection) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM financial_account WHERE id = ?1", params![id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingAccount);
    }

    Ok(())
}

#[cfg(test)]
mod magnitude_tests {
    use rust_decimal_macros::dec;

    use crate::{Error, account::Magnitude};

    #[test]
    fn accepts_zero_and_positive_amounts() {
        assert_eq!(Magnitude::new(dec!(0)).unwrap().as_decimal(), dec!(0.00));
        assert_eq!(
            Magnitude::new(dec!(150)).unwrap().as_decimal().to_string(),
            "150.00"
        );
    }

    #[test]
    fn rejects_negative_amounts() {
        assert_eq!(Magnitude::new(dec!(-0.01)), Err(Error::NegativeBalance));
    }

    #[test]
    fn negative_zero_is_zero() {
        assert_eq!(
            Magnitude::new(dec!(-0.001)).unwrap().as_decimal().to_string(),
            "0.00"
        );
    }

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(Magnitude::new(dec!(1.005)).unwrap().as_decimal(), dec!(1.00));
        assert_eq!(Magnitude::new(dec!(1.015)).unwrap().as_decimal(), dec!(1.02));
    }

    #[test]
    fn rejects_amounts_with_more_than_twelve_digits() {
        assert!(Magnitude::new(dec!(9999999999.99)).is_ok());
        assert!(matches!(
            Magnitude::new(dec!(10000000000.00)),
            Err(Error::BalanceTooLarge(_))
        ));
    }

    #[test]
    fn parse_trims_input() {
        assert_eq!(
            Magnitude::parse(" 1234.5 ").unwrap().as_decimal(),
            dec!(1234.50)
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(
            Magnitude::parse("twelve"),
            Err(Error::InvalidBalance("twelve".to_owned()))
        );
    }
}

#[cfg(test)]
mod new_account_tests {
    use rust_decimal_macros::dec;

    use crate::{
        Error, UserID,
        account::{Magnitude, NewAccount},
    };

    fn balance() -> Magnitude {
        Magnitude::new(dec!(10)).unwrap()
    }

    #[test]
    fn trims_fields_and_drops_blank_account_number() {
        let account =
            NewAccount::new(UserID::new(1), "  checking ", Some("   "), balance(), false).unwrap();

        assert_eq!(account.account_type, "checking");
        assert_eq!(account.account_number, None);
    }

    #[test]
    fn rejects_blank_account_type() {
        let result = NewAccount::new(UserID::new(1), " ", None, balance(), false);

        assert_eq!(result, Err(Error::EmptyAccountType));
    }

    #[test]
    fn rejects_long_account_number() {
        let result = NewAccount::new(
            UserID::new(1),
            "savings",
            Some("123456789012345678901"),
            balance(),
            false,
        );

        assert_eq!(
            result,
            Err(Error::FieldTooLong {
                field: "Account number",
                max_length: 20
            })
        );
    }
}

#[cfg(test)]
mod store_tests {
    use rusqlite::{Connection, params};
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    use crate::{
        Error, PasswordHash, UserID,
        account::{
            Magnitude, NewAccount, create_account, delete_account, get_account, update_account,
        },
        initialize_db,
        user::create_user,
    };

    fn get_connection_with_user() -> (Connection, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize_db(&connection).unwrap();
        let user = create_user(
            "alice",
            PasswordHash::new_unchecked("hunter2"),
            false,
            &connection,
        )
        .unwrap();

        (connection, user.id)
    }

    fn new_account(owner: UserID) -> NewAccount {
        NewAccount::new(
            owner,
            "checking",
            Some("1234"),
            Magnitude::new(dec!(150.00)).unwrap(),
            true,
        )
        .unwrap()
    }

    #[test]
    fn create_account_round_trips_through_database() {
        let (connection, owner) = get_connection_with_user();

        let created = create_account(&new_account(owner), &connection).unwrap();
        let fetched = get_account(created.id, &connection).unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.owner_username, "alice");
        assert_eq!(fetched.balance.as_decimal(), dec!(150.00));
        assert!(fetched.is_negative);
        assert_eq!(fetched.display_name(), "alice - checking-1234*");
    }

    #[test]
    fn create_account_rejects_unknown_owner() {
        let (connection, _) = get_connection_with_user();

        let result = create_account(&new_account(UserID::new(999)), &connection);

        assert_eq!(result, Err(Error::InvalidOwner));
    }

    #[test]
    fn update_account_overwrites_fields() {
        let (connection, owner) = get_connection_with_user();
        let created = create_account(&new_account(owner), &connection).unwrap();
        let changes = NewAccount::new(
            owner,
            "savings",
            None,
            Magnitude::new(dec!(20.5)).unwrap(),
            false,
        )
        .unwrap();

        let updated = update_account(created.id, &changes, &connection).unwrap();

        assert_eq!(updated.account_type, "savings");
        assert_eq!(updated.account_number, None);
        assert_eq!(updated.balance.as_decimal(), dec!(20.50));
        assert!(!updated.is_negative);
    }

    #[test]
    fn update_account_moves_timestamp_forward() {
        let (connection, owner) = get_connection_with_user();
        let created = create_account(&new_account(owner), &connection).unwrap();
        let long_ago = datetime!(2000-01-01 0:00 UTC);
        connection
            .execute(
                "UPDATE financial_account SET last_updated = ?1 WHERE id = ?2",
                params![long_ago, created.id],
            )
            .unwrap();
        assert_eq!(
            get_account(created.id, &connection).unwrap().last_updated,
            long_ago
        );

        let updated = update_account(created.id, &new_account(owner), &connection).unwrap();

        assert!(updated.last_updated > long_ago);
    }

    #[test]
    fn update_missing_account_fails() {
        let (connection, owner) = get_connection_with_user();

        let result = update_account(42, &new_account(owner), &connection);

        assert_eq!(result, Err(Error::UpdateMissingAccount));
    }

    #[test]
    fn delete_account_removes_row() {
        let (connection, owner) = get_connection_with_user();
        let created = create_account(&new_account(owner), &connection).unwrap();

        assert_eq!(delete_account(created.id, &connection), Ok(()));
        assert_eq!(get_account(created.id, &connection), Err(Error::NotFound));
        assert_eq!(
            delete_account(created.id, &connection),
            Err(Error::DeleteMissingAccount)
        );
    }

    #[test]
    fn deleting_owner_deletes_their_accounts() {
        let (connection, owner) = get_connection_with_user();
        let created = create_account(&new_account(owner), &connection).unwrap();

        connection
            .execute("DELETE FROM user WHERE id = ?1", [owner.as_i64()])
            .unwrap();

        assert_eq!(get_account(created.id, &connection), Err(Error::NotFound));
    }
}
