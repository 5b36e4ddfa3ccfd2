use actix_web::{web, App, HttpServer, middleware::Compress};
use actix_cors::Cors;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use fixmate::auth::TokenKeys;
use fixmate::config::AppConfig;
use fixmate::openapi::ApiDoc;
use fixmate::repo::pg::PgRepo;
use fixmate::storage::FsPhotoStore;
use fixmate::{config, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds; production sets the environment externally.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    // Structured logging initialisation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = AppConfig::from_env()?;
    info!("Bootstrapping fixmate server");
    info!("Upload directory: {}", cfg.upload_dir.display());

    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .connect_lazy(&cfg.database_url)?;
    info!(max_connections = cfg.max_connections, "Postgres pool configured");

    tokio::fs::create_dir_all(&cfg.upload_dir).await?;
    let state = AppState {
        repo: Arc::new(PgRepo::new(pool)),
        photo_store: Arc::new(FsPhotoStore::new(cfg.upload_dir.clone())),
        tokens: Arc::new(TokenKeys::from_secret(cfg.jwt_secret.as_bytes())),
    };
    let openapi = ApiDoc::openapi();
    let frontend_url = cfg.frontend_url.clone();

    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                // Vite dev server and the containerised SPA
                .allowed_origin("http://localhost:5173")
                .allowed_origin("http://127.0.0.1:5173")
                .allowed_origin("http://localhost:8080")
                .allow_any_header()
                .allowed_methods(["GET", "POST", "PUT", "PATCH", "OPTIONS"])
                .max_age(3600);
            if let Some(front) = &frontend_url {
                c = c.allowed_origin(front);
            }
            c
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind((cfg.bind_addr.as_str(), cfg.port))?;

    info!("Listening on http://{}:{}", cfg.bind_addr, cfg.port);

    server.run().await?;
    Ok(())
}
