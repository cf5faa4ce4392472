/// Identity Service Main Entry Point
///
/// Starts the HTTP and gRPC servers with:
/// - PostgreSQL connection pool (credential store)
/// - Redis connection manager (session and revocation registries)
use actix_web::{middleware::Logger, App, HttpServer};
use anyhow::{Context, Result};
use crypto_core::jwt::TokenCodec;
use identity_service::{
    config::Settings,
    db::PgUserRepository,
    grpc::{portal::auth::auth_service_server::AuthServiceServer, IdentityServiceServer},
    http,
    security::{PasswordHasherService, RedisRevocationStore, RedisSessionStore},
    AuthService, TokenLifetimes,
};
use redis_utils::RedisPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinSet;
use tonic::transport::Server;
use tracing::{error, info, warn};

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "identity_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Identity Service");

    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .acquire_timeout(settings.database.acquire_timeout)
        .connect(&settings.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!(
        "Database pool initialized with {} max connections",
        settings.database.max_connections
    );

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations completed");

    let redis_pool = RedisPool::connect(&settings.redis.url)
        .await
        .context("Failed to connect to Redis")?;
    let redis = redis_pool.manager();
    info!("Redis connection manager initialized");

    let codec = TokenCodec::new(settings.jwt.secret.as_bytes())
        .context("Failed to initialize token codec")?;
    let hasher = PasswordHasherService::new(settings.password)
        .context("Failed to initialize password hasher")?;

    let redis_timeout = settings.redis.response_timeout;
    let auth = Arc::new(AuthService::new(
        Arc::new(PgUserRepository::new(db_pool.clone())),
        Arc::new(RedisSessionStore::new(redis.clone(), redis_timeout)),
        Arc::new(RedisRevocationStore::new(redis, redis_timeout)),
        codec,
        hasher,
        TokenLifetimes::from(&settings.jwt),
    ));

    let http_addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.http_port)
        .parse()
        .context("Invalid HTTP address")?;
    let grpc_addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.grpc_port)
        .parse()
        .context("Invalid gRPC address")?;

    info!("Starting HTTP server on {}", http_addr);
    info!("Starting gRPC server on {}", grpc_addr);

    let http_auth = auth.clone();
    let http_server = HttpServer::new(move || {
        let auth = http_auth.clone();
        App::new()
            .wrap(Logger::default())
            .configure(move |cfg| http::configure(cfg, auth))
    })
    .bind(http_addr)
    .context("Failed to bind HTTP listener")?
    .run();

    let grpc_service = AuthServiceServer::new(IdentityServiceServer::new(auth));

    let mut tasks = JoinSet::new();

    tasks.spawn(async move {
        info!("HTTP server is running");
        http_server.await.context("HTTP server error")
    });

    tasks.spawn(async move {
        info!("gRPC server is running");
        Server::builder()
            .add_service(grpc_service)
            .serve_with_shutdown(grpc_addr, shutdown_signal())
            .await
            .context("gRPC server error")
    });

    let mut first_error = None;
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Ok(())) => warn!("Server completed"),
            Ok(Err(e)) => {
                error!("Server error: {:#}", e);
                first_error.get_or_insert(e);
            }
            Err(e) => {
                error!("Task error: {}", e);
                first_error.get_or_insert(anyhow::Error::new(e));
            }
        }
    }

    info!("Identity service shutdown complete");

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
