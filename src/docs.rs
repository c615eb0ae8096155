// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Dashboard ---
        handlers::dashboard::get_snapshot,
        handlers::dashboard::get_monthly_events,
        handlers::dashboard::get_financial_balance,
        handlers::dashboard::get_new_prospects,
        handlers::dashboard::get_stage_distribution,
        handlers::dashboard::get_upcoming_appointments,
        handlers::dashboard::get_performance,
        handlers::dashboard::get_quick_stats,
        handlers::dashboard::invalidate_cache,
    ),
    components(
        schemas(
            // --- DASHBOARD ---
            models::dashboard::DashboardSnapshot,
            models::dashboard::MonthlyEvent,
            models::dashboard::FinancialBalance,
            models::dashboard::OutstandingQuote,
            models::dashboard::ProspectSummary,
            models::dashboard::StageShare,
            models::dashboard::UpcomingAppointment,
            models::dashboard::PerformanceMetrics,
            models::dashboard::MonthlyTrend,
            models::dashboard::TrendDirection,
            models::dashboard::TopEventType,
            models::dashboard::TopChannel,
            models::dashboard::QuickStats,

            // --- Payloads ---
            handlers::dashboard::InvalidationResponse,
        )
    ),
    tags(
        (name = "Dashboard", description = "Indicadores agregados do estúdio")
    )
)]
pub struct ApiDoc;
