use todo_list::config::{ServerConfig, StoreBackend};
use todo_list::server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env().map_err(todo_list::error::Error::from)?;

    eprintln!("📝 Todo List v{}", env!("CARGO_PKG_VERSION"));
    match config.backend {
        StoreBackend::LibSql => eprintln!("   Database: {}", config.db_path.display()),
        StoreBackend::Memory => eprintln!("   Database: in-memory"),
    }
    eprintln!("   API: http://{}/api/todoitems\n", config.bind_addr());

    let db = config
        .open_database()
        .await
        .map_err(todo_list::error::Error::from)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;

    server::serve(listener, db, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutting down");
    })
    .await?;

    Ok(())
}
