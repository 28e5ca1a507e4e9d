// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use cli::{Cli, Commands, DbArgs};
use sqlx::postgres::PgPoolOptions;
use vouch_core::auth::bootstrap::{BootstrapOutcome, ensure_bootstrap_admin};
use vouch_core::auth::clients::ClientRegistry;
use vouch_core::auth::keys::generate_rsa_keypair;
use vouch_core::config::BootstrapAdmin;
use vouch_core::maintenance::sweep;
use vouch_core::store::{PgStore, connect_options};

mod cli;
mod logging;

/// Per-statement limit for operator commands.
const STATEMENT_TIMEOUT: Duration = Duration::from_secs(60);

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    logging::init()?;

    let args = Cli::parse();

    match args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::Keygen { out, bits, force } => keygen(&out, bits, force)?,
        Commands::CreateClient {
            db,
            name,
            redirect_uri,
            origins,
        } => block_on(async {
            let store = connect(&db).await?;
            let registered = ClientRegistry::new(store)
                .register(&name, &redirect_uri, origins)
                .await?;
            println!("client_id:     {}", registered.client.client_id);
            println!("client_secret: {}", registered.client_secret);
            log::warn!("the client secret is not stored and cannot be shown again");
            Ok(())
        })?,
        Commands::BootstrapAdmin {
            db,
            email,
            password,
            name,
        } => block_on(async {
            let store = connect(&db).await?;
            let admin = BootstrapAdmin {
                email,
                password,
                name,
            };
            match ensure_bootstrap_admin(store.as_ref(), &admin).await? {
                BootstrapOutcome::AlreadyPresent => log::info!("an active admin already exists"),
                BootstrapOutcome::Promoted(id) => log::info!("promoted {id} to admin"),
                BootstrapOutcome::Created(id) => log::info!("created admin {id}"),
            }
            Ok(())
        })?,
        Commands::Sweep { db } => block_on(async {
            let store = connect(&db).await?;
            let report = sweep(store.as_ref(), chrono::Utc::now()).await?;
            println!(
                "removed {} blacklist entries, {} authorization codes, {} refresh tokens",
                report.blacklist, report.auth_codes, report.refresh_tokens
            );
            Ok(())
        })?,
    }

    Ok(())
}

fn block_on<F>(future: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(future)
}

async fn connect(db: &DbArgs) -> Result<std::sync::Arc<PgStore>> {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options(&db.database_url, STATEMENT_TIMEOUT)?)
        .await?;
    vouch_core::migrate::migrate(&pool).await?;
    Ok(std::sync::Arc::new(PgStore::new(pool)))
}

fn keygen(out: &Path, bits: usize, force: bool) -> Result<()> {
    let private_path = out.join("private.pem");
    let public_path = out.join("public.pem");
    if !force && (private_path.exists() || public_path.exists()) {
        return Err(Error::Custom(format!(
            "{} already contains a keypair; pass --force to overwrite",
            out.display()
        )));
    }

    let pair = generate_rsa_keypair(bits)?;
    fs::create_dir_all(out)?;
    write_private(&private_path, &pair.private_pem)?;
    fs::write(&public_path, &pair.public_pem)?;

    log::info!("wrote {}", private_path.display());
    log::info!("wrote {}", public_path.display());
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, pem: &str) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(pem.as_bytes())?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, pem: &str) -> Result<()> {
    fs::write(path, pem)?;
    Ok(())
}
