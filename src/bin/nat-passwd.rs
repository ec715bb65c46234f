//! Password file enrollment tool.
//!
//! Maintains the `username:bcrypt-hash` file read by the console at startup.
//! Changes take effect after the console restarts.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use nat_webui::auth::UserTable;

#[derive(Parser)]
#[command(name = "nat-passwd")]
#[command(about = "Manage NAT console users", long_about = None)]
struct Cli {
    /// Password file to edit
    #[arg(short, long, default_value = "passwd.md")]
    file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a user or replace their password
    Add {
        username: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        cost: u32,
    },
    /// List usernames
    List,
    /// Remove a user
    Delete { username: String },
    /// Check a password against the stored hash
    Verify {
        username: String,
        #[arg(long)]
        password: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Add {
            username,
            password,
            cost,
        } => {
            let mut table = UserTable::load_or_default(&cli.file)?;
            let password = match password {
                Some(p) => p,
                None => prompt("Password: ")?,
            };
            if password.is_empty() {
                return Err("password must not be empty".into());
            }
            let replaced = table.lookup(&username).is_some();
            table.set_password(&username, &password, cost)?;
            table.save(&cli.file)?;
            if replaced {
                println!("Password for {} updated in {}", username, cli.file.display());
            } else {
                println!("User {} added to {}", username, cli.file.display());
            }
        }
        Commands::List => {
            let table = UserTable::load(&cli.file)?;
            for user in table.usernames() {
                println!("{}", user);
            }
        }
        Commands::Delete { username } => {
            let mut table = UserTable::load(&cli.file)?;
            if !table.remove(&username) {
                return Err(format!("no such user: {}", username).into());
            }
            table.save(&cli.file)?;
            println!("User {} removed", username);
        }
        Commands::Verify { username, password } => {
            let table = UserTable::load(&cli.file)?;
            let password = match password {
                Some(p) => p,
                None => prompt("Password: ")?,
            };
            if table.verify(&username, &password) {
                println!("Password matches");
            } else {
                println!("Password does not match");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
