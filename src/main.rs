//src/main.rs

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

// Importações principais
use crate::config::AppState;
use crate::docs::ApiDoc;

#[tokio::main]
async fn main() {
    // Inicializa o logger.
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // As rotas do dashboard: sete accessors de leitura, o snapshot completo
    // e o gancho de invalidação de cache. Todas exigem o X-Tenant-ID.
    let dashboard_routes = Router::new()
        .route("/snapshot", get(handlers::dashboard::get_snapshot))
        .route("/monthly-events", get(handlers::dashboard::get_monthly_events))
        .route("/financial-balance", get(handlers::dashboard::get_financial_balance))
        .route("/new-prospects", get(handlers::dashboard::get_new_prospects))
        .route("/stage-distribution", get(handlers::dashboard::get_stage_distribution))
        .route("/upcoming-appointments", get(handlers::dashboard::get_upcoming_appointments))
        .route("/performance", get(handlers::dashboard::get_performance))
        .route("/quick-stats", get(handlers::dashboard::get_quick_stats))
        .route("/invalidate", post(handlers::dashboard::invalidate_cache));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/dashboard", dashboard_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
