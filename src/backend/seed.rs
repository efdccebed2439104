/**
 * Teamchat Seed
 *
 * Creates an admin user and a `general` room in the configured PostgreSQL
 * database, then prints a bearer token for that admin.
 *
 * Environment: `DATABASE_URL` (required), `JWT_SECRET`, `SEED_ADMIN_EMAIL`,
 * `SEED_ADMIN_NAME`, `SEED_ADMIN_PASSWORD`.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use teamchat::backend::auth::create_token;
    use teamchat::backend::messaging::{MessageStore, NewUser, PgMessageStore};
    use teamchat::backend::server::ServerConfig;
    use teamchat::shared::messaging::MemberRole;

    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .init();

    let config = ServerConfig::from_env();
    let database_url = config
        .database_url
        .clone()
        .ok_or("DATABASE_URL must be set to seed a database")?;

    let pool = sqlx::PgPool::connect(&database_url).await?;
    let store = PgMessageStore::new(pool);
    store.migrate().await?;

    let email = std::env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@teamchat.local".to_string());
    let name = std::env::var("SEED_ADMIN_NAME").unwrap_or_else(|_| "Admin".to_string());
    let password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "changeme".to_string());

    let mut new_user = NewUser::new(email, name).admin();
    new_user.password_hash = Some(bcrypt::hash(&password, bcrypt::DEFAULT_COST)?);
    let admin = store.create_user(new_user).await?;

    let group = store.create_group("general", false).await?;
    store.add_member(group.id, admin.id, MemberRole::Admin).await?;

    let token = create_token(&config.jwt_secret, admin.id, true)?;

    tracing::info!("Seeded admin {} and group {}", admin.id, group.id);
    println!("admin_id={}", admin.id);
    println!("group_id={}", group.id);
    println!("token={}", token);
    Ok(())
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("Seeding requires the 'ssr' feature to be enabled.");
    std::process::exit(1);
}
