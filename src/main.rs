// budgetbook - Admin CLI
// User accounts and API tokens are managed here, out of band from the HTTP
// API. The server only ever resolves tokens this tool has minted.

use anyhow::{bail, Result};
use budgetbook::{database_path, db, users};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("init") => run_init(),
        Some("adduser") => run_adduser(args.get(2)),
        Some("rmuser") => run_rmuser(args.get(2)),
        Some("rotate") => run_rotate(args.get(2)),
        Some("users") => run_users(),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("budgetbook {} - personal finance API admin", budgetbook::VERSION);
    println!();
    println!("Usage:");
    println!("  budgetbook init              Create the database schema");
    println!("  budgetbook adduser <email>   Create a user and print their API token");
    println!("  budgetbook rmuser <email>    Delete a user and all their budgets");
    println!("  budgetbook rotate <email>    Mint a new token, invalidating the old one");
    println!("  budgetbook users             List registered users");
    println!();
    println!("Environment:");
    println!("  BUDGETBOOK_DB    Database file (default: budgetbook.db)");
}

fn run_init() -> Result<()> {
    let path = database_path();
    let conn = db::open_database(&path)?;
    db::setup_database(&conn)?;
    println!("Database initialized at {}", path.display());
    Ok(())
}

fn run_adduser(email: Option<&String>) -> Result<()> {
    let Some(email) = email else {
        bail!("Usage: budgetbook adduser <email>");
    };

    let conn = db::open_database(&database_path())?;
    let (user, token) = users::create_user(&conn, email)?;

    println!("Created user {} (id {})", user.email, user.id);
    println!();
    println!("API token (shown once, store it now):");
    println!("  {}", token);
    Ok(())
}

fn run_rmuser(email: Option<&String>) -> Result<()> {
    let Some(email) = email else {
        bail!("Usage: budgetbook rmuser <email>");
    };

    let conn = db::open_database(&database_path())?;
    users::delete_user(&conn, email)?;
    println!("Deleted user {} and all owned budgets", email);
    Ok(())
}

fn run_rotate(email: Option<&String>) -> Result<()> {
    let Some(email) = email else {
        bail!("Usage: budgetbook rotate <email>");
    };

    let conn = db::open_database(&database_path())?;
    let token = users::rotate_token(&conn, email)?;

    println!("Rotated token for {}", email);
    println!();
    println!("New API token (shown once, store it now):");
    println!("  {}", token);
    Ok(())
}

fn run_users() -> Result<()> {
    let conn = db::open_database(&database_path())?;
    let users = users::list_users(&conn)?;

    if users.is_empty() {
        println!("No users registered. Run: budgetbook adduser <email>");
        return Ok(());
    }

    for user in users {
        println!("{:>6}  {}", user.id, user.email);
    }
    Ok(())
}
