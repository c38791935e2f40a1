use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use blogicum::config::{Cli, Command, Config};
use blogicum::state::AppState;
use blogicum::{admin, auth, db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::debug!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    match &cli.command {
        None | Some(Command::Serve) => {}
        Some(command) => {
            let conn = pool.get()?;
            for line in admin::run(&conn, command)? {
                println!("{}", line);
            }
            return Ok(());
        }
    }

    // Ensure media directory exists
    std::fs::create_dir_all(config.media_path())?;

    {
        let conn = pool.get()?;
        let purged = auth::session::purge_expired(&conn)?;
        if purged > 0 {
            tracing::info!("Purged {} expired sessions", purged);
        }
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = routes::app(AppState { db: pool, config });

    // Start server
    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
