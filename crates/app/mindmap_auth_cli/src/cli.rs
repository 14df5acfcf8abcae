use clap::{Parser, Subcommand};
use mindmap_auth::auth::password::DEFAULT_BCRYPT_COST;
use mindmap_auth::config::GENERATED_SECRET_BYTES;

#[derive(Parser, Debug)]
#[command(name = "mindmap-auth", version, about = "MyMindmap auth operator tool")]
pub struct Cli {
    /// Log level or filter spec when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print version
    Version,

    /// Generate a random hex-encoded secret for JWT_SECRET or SESSION_KEY
    GenSecret {
        /// Number of random bytes
        #[arg(long, default_value_t = GENERATED_SECRET_BYTES as u16, value_parser = clap::value_parser!(u16).range(16..=1024))]
        bytes: u16,
    },

    /// Hash a password with bcrypt
    HashPassword {
        password: String,

        /// bcrypt cost factor
        #[arg(long, default_value_t = DEFAULT_BCRYPT_COST, value_parser = clap::value_parser!(u32).range(4..=31))]
        cost: u32,
    },

    /// Check a password against a bcrypt hash; exits non-zero on mismatch
    VerifyPassword { hash: String, password: String },

    /// Validate a token with JWT_SECRET and print its claims
    InspectToken {
        /// Raw token or a full `Bearer <token>` header value
        token: String,
    },

    /// Print the effective configuration with secrets redacted
    Config,

    /// List the seeded access policy
    Policies {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}
