//! Creates an admin account, or promotes an existing user to admin.
//!
//! ```sh
//! cargo run --bin create-admin -- ops@example.com --name Ops --password 'change-me-now'
//! ```

use anyhow::{bail, Result};
use clap::Parser;
use dotenvy::dotenv;
use rust_decimal::Decimal;
use tracing::info;

use budget_tracker::backend::auth::password;
use budget_tracker::backend::validate::{check_new_password, normalize_email, required_text};
use budget_tracker::config::Config;
use budget_tracker::database::db::{connection::get_db_pool, migrate, queries};
use budget_tracker::database::models::{NewUser, Role};
use budget_tracker::logging;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Email of the account to create or promote
    email: String,

    /// Display name, only used when the account is created
    #[arg(long, default_value = "Administrator")]
    name: String,

    /// Password, required when the account does not exist yet
    #[arg(long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    logging::init();

    let args = Args::parse();
    let config = Config::load()?;

    let email = normalize_email(&args.email)?;

    let pool = get_db_pool(&config.database_url, config.db_max_connections).await?;
    migrate::run_migrations(&pool).await?;

    if let Some(user) = queries::get_user_by_email(&pool, &email).await? {
        if user.role == Role::Admin {
            info!(user_id = user.id, "{email} is already an admin");
            return Ok(());
        }
        queries::set_user_role(&pool, user.id, Role::Admin).await?;
        info!(user_id = user.id, "Promoted {email} to admin");
        return Ok(());
    }

    let Some(plain) = args.password else {
        bail!("{email} does not exist yet; pass --password to create it");
    };
    check_new_password(&plain, &plain)?;
    let name = required_text(&args.name, "Name")?;

    let password_hash = password::hash_password(&plain, config.password_hash_rounds);
    let user = queries::create_user(
        &pool,
        &NewUser {
            name: &name,
            email: &email,
            password_hash: &password_hash,
            role: Role::Admin,
            budget_limit: Decimal::ZERO,
        },
    )
    .await?;

    info!(user_id = user.id, "Created admin {email}");
    Ok(())
}
