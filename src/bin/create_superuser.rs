use sqlx::postgres::PgPoolOptions;

use recipebox::{config::AppConfig, users::service};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "recipebox=info".to_string());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut args = std::env::args().skip(1);
    let (Some(email), Some(password)) = (args.next(), args.next()) else {
        anyhow::bail!("usage: create_superuser <email> <password>");
    };

    let config = AppConfig::from_env()?;
    let db = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await?;

    let user =
        service::create_superuser(&db, config.auth.min_password_len, &email, &password).await?;
    tracing::info!(user_id = %user.id, email = %user.email, "superuser created");
    Ok(())
}
