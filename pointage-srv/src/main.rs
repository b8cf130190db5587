//! pointage-srv - operator time-tracking backend
//!
//! REST service for floor operators logging work against launch codes,
//! admin session review, and export of raw clock events into the unified
//! operations ledger.

use anyhow::Result;
use clap::Parser;
use pointage_common::config::resolve_root_folder;
use pointage_common::db::{init_database, load_setting, load_setting_bool};
use pointage_srv::directory::OperatorDirectory;
use pointage_srv::reconcile::{provision_ledger, Reconciler};
use pointage_srv::{build_router, AppState};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "pointage-srv", about = "Operator time-tracking backend")]
struct Args {
    /// Root folder holding the database (overrides POINTAGE_ROOT and config)
    #[arg(long)]
    root_folder: Option<String>,

    /// Listen port
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber before anything else
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting pointage-srv v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let root_folder = resolve_root_folder(
        args.root_folder.as_deref(),
        "POINTAGE_ROOT",
        Some("root_folder"),
    )?;
    std::fs::create_dir_all(&root_folder)?;

    let db_path = root_folder.join("pointage.db");
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;

    let admin_token = load_setting(&pool, "admin_token").await?.unwrap_or_default();
    if admin_token.is_empty() {
        info!("Admin authentication disabled (empty admin_token)");
    }

    let directory_source = load_setting(&pool, "directory_source")
        .await?
        .unwrap_or_else(|| "database".to_string());
    let directory = OperatorDirectory::from_setting(&directory_source, &pool)?;
    info!("Operator directory source: {}", directory_source);

    // Optional startup export: provision first, then a best-effort run
    // scoped to today. A failed run is logged, not fatal.
    if load_setting_bool(&pool, "export_auto_provision").await? {
        provision_ledger(&pool).await?;

        if load_setting_bool(&pool, "export_run_on_start").await? {
            let today = chrono::Utc::now().date_naive();
            match Reconciler::new(pool.clone()).run(Some(today)).await {
                Ok(summary) => info!(
                    "Startup export done: scanned {} inserted {}",
                    summary.scanned, summary.inserted
                ),
                Err(e) => error!("Startup export failed: {}", e),
            }
        }
    }

    let state = AppState::new(pool, admin_token, directory);
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("pointage-srv listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
