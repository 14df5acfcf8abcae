// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands};

mod cli;
mod commands;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let args = Cli::parse();
    let _logger = logging::init(&args.log_level)?;

    match &args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), mindmap_auth::version());
        }
        Commands::GenSecret { bytes } => commands::gen_secret(*bytes)?,
        Commands::HashPassword { password, cost } => commands::hash(password, *cost)?,
        Commands::VerifyPassword { hash, password } => commands::verify(hash, password)?,
        Commands::InspectToken { token } => commands::inspect_token(token)?,
        Commands::Config => commands::show_config()?,
        Commands::Policies { json } => commands::policies(*json)?,
    }

    Ok(())
}
