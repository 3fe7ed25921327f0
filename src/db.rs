//! Database initialisation.

use rusqlite::Connection;

use crate::{Error, account::create_account_table, user::create_user_table};

/// Turn on foreign key enforcement and create the application's tables if
/// they do not exist yet.
///
/// Foreign keys are enabled per connection in SQLite, so this must be called
/// on every connection handed to the app.
///
/// # Errors
/// Returns an error if a pragma or table creation statement fails.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = connection.unchecked_transaction()?;
    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        assert_eq!(initialize(&connection), Ok(()));
        assert_eq!(initialize(&connection), Ok(()));
    }

    #[test]
    fn initialize_enables_foreign_keys() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let enabled: bool = connection
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();

        assert!(enabled);
    }
}
