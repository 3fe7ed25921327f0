use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rust_decimal::Decimal;
use rusqlite::Connection;

use ledgerly::{
    Magnitude, NewAccount, PasswordHash, User, ValidatedPassword, create_account, create_user,
    initialize_db,
};

/// A utility for creating a test database for the ledgerly server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test users...");
    let admin = create_test_user("admin", true, &conn)?;
    let alice = create_test_user("alice", false, &conn)?;

    println!("Creating sample accounts...");
    for (owner, account_type, account_number, balance, is_negative) in [
        (&admin, "checking", Some("01-0001-0000001-00"), Decimal::new(250_000, 2), false),
        (&alice, "checking", Some("01-0002-0000002-00"), Decimal::new(10_000, 2), false),
        (&alice, "savings", None, Decimal::new(1_234_550, 2), false),
        (&alice, "credit card", Some("4111"), Decimal::new(15_000, 2), true),
    ] {
        let new_account = NewAccount::new(
            owner.id,
            account_type,
            account_number,
            Magnitude::new(balance)?,
            is_negative,
        )?;
        create_account(&new_account, &conn)?;
    }

    println!("Success! Log in as 'admin' or 'alice' with the password 'test'.");

    Ok(())
}

fn create_test_user(
    username: &str,
    is_staff: bool,
    conn: &Connection,
) -> Result<User, Box<dyn Error>> {
    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;

    Ok(create_user(username, password_hash, is_staff, conn)?)
}
