use std::{net::SocketAddr, sync::Arc};

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::{
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use reqwest::Client;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use helpdesk_backend::config::Config;
use helpdesk_backend::db::postgres_ticket_repository::PostgresTicketRepository;
use helpdesk_backend::db::postgres_user_repository::PostgresUserRepository;
use helpdesk_backend::db::{
    ticket_repository::TicketRepository, user_repository::UserRepository,
};
use helpdesk_backend::engine::TicketEngine;
use helpdesk_backend::responses::JsonResponse;
use helpdesk_backend::routes::{api_router, session::ACTOR_HEADER};
use helpdesk_backend::services::assist::{AssistService, ClaudeAssist, NoopAssist};
use helpdesk_backend::services::notifier::LogNotifier;
use helpdesk_backend::worker::start_background_workers;
use helpdesk_backend::AppState;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let rate_limit_ms: u64 = std::env::var("RATE_LIMITER_MILLISECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        // Default: 200ms/token (~5 req/sec)
        .unwrap_or(200);
    let rate_limit_burst: u32 = std::env::var("RATE_LIMITER_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(20);
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(rate_limit_ms)
            .burst_size(rate_limit_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .unwrap(),
    );

    // Background task to cleanup old IPs in the rate limiter map
    let governor_limiter = governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let config = Config::from_env();

    let pg_pool = establish_connection(&config.database_url).await;
    let ticket_repo = Arc::new(PostgresTicketRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn TicketRepository>;
    let user_repo = Arc::new(PostgresUserRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn UserRepository>;

    let assist: Arc<dyn AssistService> = match &config.claude_api_key {
        Some(api_key) => {
            info!("assist suggestions enabled");
            Arc::new(ClaudeAssist {
                client: Client::new(),
                api_key: api_key.clone(),
            })
        }
        None => Arc::new(NoopAssist),
    };

    let engine = Arc::new(TicketEngine::new(
        ticket_repo.clone(),
        user_repo.clone(),
        Arc::new(LogNotifier),
        config.auto_progress_on_staff_reply,
    ));

    let state = AppState {
        engine,
        tickets: ticket_repo,
        users: user_repo,
        assist,
    };

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(ACTOR_HEADER),
        ])
        .allow_credentials(true);

    let app = Router::new()
        .route("/", get(root))
        .merge(api_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: governor_conf,
        })
        .layer(cors);

    start_background_workers(state, config.breach_scan_interval_secs).await;

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = TcpListener::bind(addr).await.unwrap();
    println!("Running at http://{}", addr);
    axum::serve(listener, make_service).await.unwrap();
}

/// A simple root route.
async fn root() -> Response {
    JsonResponse::success("Helpdesk backend up").into_response()
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> PgPool {
    let pool = PgPool::connect(database_url)
        .await
        .expect("Failed to connect to the database");

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .expect("Failed to verify database connection");

    info!("Successfully connected to the database");
    pool
}
