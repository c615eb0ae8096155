// src/handlers/dashboard.rs

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid; // Importante para o Swagger params

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantContext,
    // Importamos os models para referenciar no Swagger
    models::dashboard::{
        DashboardSnapshot, FinancialBalance, MonthlyEvent, PerformanceMetrics, ProspectSummary,
        QuickStats, StageShare, UpcomingAppointment,
    },
};

// GET /api/dashboard/snapshot
#[utoipa::path(
    get,
    path = "/api/dashboard/snapshot",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Snapshot completo do dashboard do estúdio", body = DashboardSnapshot),
        (status = 400, description = "Cabeçalho de tenant ausente ou inválido"),
        (status = 500, description = "Falha ao compor o dashboard")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Estúdio")
    )
)]
pub async fn get_snapshot(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = app_state.dashboard_service.compose_snapshot(tenant.0).await?;

    // ETag derivado da época de invalidação: muda quando algum módulo de
    // escrita chamar POST /invalidate, forçando o cache do front a refazer
    // o fetch. Falhas nunca chegam aqui, então nunca são cacheadas.
    let etag = format!(
        "\"dash-{}-{}\"",
        tenant.0,
        app_state.dashboard_service.cache_epoch(tenant.0)
    );

    Ok((StatusCode::OK, [(header::ETAG, etag)], Json(snapshot)))
}

// GET /api/dashboard/monthly-events
#[utoipa::path(
    get,
    path = "/api/dashboard/monthly-events",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Agenda do mês corrente (até 10 itens)", body = Vec<MonthlyEvent>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Estúdio")
    )
)]
pub async fn get_monthly_events(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let events = app_state.dashboard_service.monthly_events(tenant.0).await?;
    Ok((StatusCode::OK, Json(events)))
}

// GET /api/dashboard/financial-balance
#[utoipa::path(
    get,
    path = "/api/dashboard/financial-balance",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Faturado, pago no mês e saldos pendentes", body = FinancialBalance)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Estúdio")
    )
)]
pub async fn get_financial_balance(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let balance = app_state.dashboard_service.financial_balance(tenant.0).await?;
    Ok((StatusCode::OK, Json(balance)))
}

// GET /api/dashboard/new-prospects
#[utoipa::path(
    get,
    path = "/api/dashboard/new-prospects",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Prospectos criados no mês (até 8, mais recentes primeiro)", body = Vec<ProspectSummary>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Estúdio")
    )
)]
pub async fn get_new_prospects(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let prospects = app_state.dashboard_service.new_prospects(tenant.0).await?;
    Ok((StatusCode::OK, Json(prospects)))
}

// GET /api/dashboard/stage-distribution
#[utoipa::path(
    get,
    path = "/api/dashboard/stage-distribution",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Distribuição de eventos ativos por etapa do pipeline", body = Vec<StageShare>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Estúdio")
    )
)]
pub async fn get_stage_distribution(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let distribution = app_state.dashboard_service.stage_distribution(tenant.0).await?;
    Ok((StatusCode::OK, Json(distribution)))
}

// GET /api/dashboard/upcoming-appointments
#[utoipa::path(
    get,
    path = "/api/dashboard/upcoming-appointments",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Citas dos próximos 7 dias (até 6)", body = Vec<UpcomingAppointment>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Estúdio")
    )
)]
pub async fn get_upcoming_appointments(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let appointments = app_state
        .dashboard_service
        .upcoming_appointments(tenant.0)
        .await?;
    Ok((StatusCode::OK, Json(appointments)))
}

// GET /api/dashboard/performance
#[utoipa::path(
    get,
    path = "/api/dashboard/performance",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Conversão, tendência mensal, tipo e canal líderes", body = PerformanceMetrics)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Estúdio")
    )
)]
pub async fn get_performance(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let metrics = app_state.dashboard_service.performance(tenant.0).await?;
    Ok((StatusCode::OK, Json(metrics)))
}

// GET /api/dashboard/quick-stats
#[utoipa::path(
    get,
    path = "/api/dashboard/quick-stats",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Resumo rápido para o cabeçalho da página", body = QuickStats)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Estúdio")
    )
)]
pub async fn get_quick_stats(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let stats = app_state.dashboard_service.quick_stats(tenant.0).await?;
    Ok((StatusCode::OK, Json(stats)))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationResponse {
    /// Época atual do tenant depois do avanço.
    pub epoch: u64,
}

// POST /api/dashboard/invalidate
#[utoipa::path(
    post,
    path = "/api/dashboard/invalidate",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Avança a época de cache do tenant após mutação nos dados", body = InvalidationResponse)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Estúdio")
    )
)]
pub async fn invalidate_cache(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let epoch = app_state.dashboard_service.invalidate(tenant.0);
    Ok((StatusCode::OK, Json(InvalidationResponse { epoch })))
}
