use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "vouch_cli", version, about = "Vouch operator tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the CLI version.
    Version,

    /// Generate an RSA signing keypair as PEM files.
    Keygen {
        /// Directory receiving `private.pem` and `public.pem`.
        #[arg(long)]
        out: PathBuf,

        /// Modulus size in bits.
        #[arg(long, default_value_t = 2048)]
        bits: usize,

        /// Overwrite existing files.
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Register a third-party client and print its one-time secret.
    CreateClient {
        #[command(flatten)]
        db: DbArgs,

        #[arg(long)]
        name: String,

        #[arg(long)]
        redirect_uri: String,

        /// Allowed browser origin; repeatable.
        #[arg(long = "origin")]
        origins: Vec<String>,
    },

    /// Ensure an active admin exists, creating or promoting one.
    BootstrapAdmin {
        #[command(flatten)]
        db: DbArgs,

        #[arg(long, env = "BOOTSTRAP_ADMIN_EMAIL")]
        email: String,

        #[arg(long, env = "BOOTSTRAP_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long, env = "BOOTSTRAP_ADMIN_NAME")]
        name: Option<String>,
    },

    /// Delete expired blacklist entries, authorization codes and refresh tokens.
    Sweep {
        #[command(flatten)]
        db: DbArgs,
    },
}

#[derive(clap::Args, Debug)]
pub struct DbArgs {
    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/vouch"
    )]
    pub database_url: String,
}
