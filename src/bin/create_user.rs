use std::{error::Error, io, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;

use ledgerly::{PasswordHash, ValidatedPassword, create_user, initialize_db};

/// A utility for registering a user with ledgerly.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The name the user will log in with.
    #[arg(long)]
    username: String,

    /// Give the user access to every account.
    #[arg(long, default_value_t = false)]
    staff: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);
    validate_db_path(db_path);

    let password_hash = match get_new_password_hash(&args.username) {
        Some(password_hash) => password_hash,
        None => return Ok(()),
    };

    let conn = Connection::open(db_path)?;
    initialize_db(&conn)?;

    match create_user(&args.username, password_hash, args.staff, &conn) {
        Ok(user) => {
            let role = if user.is_staff { "staff user" } else { "user" };
            println!("Created {role} {} with ID {}.", user.username, user.id);
            Ok(())
        }
        Err(error) => {
            print_error(&error);
            exit(1);
        }
    }
}

fn validate_db_path(db_path: &Path) {
    match db_path.extension() {
        None => {
            print_error("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            print_error("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }
}

fn prompt_password(prompt: &str) -> Option<String> {
    match rpassword::prompt_password(prompt) {
        Ok(string) => Some(string),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => None,
        Err(error) => {
            print_error(format!("Could not read password from stdin: {error}"));
            None
        }
    }
}

fn get_new_password_hash(username: &str) -> Option<PasswordHash> {
    loop {
        println!();

        let first_password = prompt_password("Enter a password: ")?;

        if let Err(error) = ValidatedPassword::new(&first_password, username) {
            print_error(error);
            continue;
        }

        let second_password = prompt_password("Enter the same password again: ")?;

        if first_password != second_password {
            print_error("Passwords must match, try again.");
            continue;
        }

        let password_hash = ValidatedPassword::new(&first_password, username)
            .and_then(|password| PasswordHash::new(password, PasswordHash::DEFAULT_COST));

        match password_hash {
            Ok(password_hash) => return Some(password_hash),
            Err(error) => {
                print_error(format!("Could not hash password: {error}. Try again."));
                continue;
            }
        }
    }
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
