use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use standings_backend::config::{self, DEFAULT_CONFIG_PATH};
use standings_backend::module::controller::{RecentNotifications, StandingsController};

mod routes;
use routes::AppState;

const NOTIFICATION_BACKLOG: usize = 32;

#[derive(Parser)]
#[command(name = "standings-web", version, about = "Interactive standings card editor")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::read_config(&cli.config)?;

    let _logging_guard =
        standings_backend::logging::init_logging(&config.log_dir, "standings-web", &config.log_level)?;
    info!("Loaded configuration from {:?}", cli.config);

    let notifications = Arc::new(RecentNotifications::new(NOTIFICATION_BACKLOG));
    let controller = StandingsController::from_config(config, notifications.clone());
    let state = AppState {
        controller: Arc::new(Mutex::new(controller)),
        notifications,
    };

    let mut app = routes::router(state).layer(TraceLayer::new_for_http());
    if config.server.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let addr = config.server_address();
    info!("Starting standings editor on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
