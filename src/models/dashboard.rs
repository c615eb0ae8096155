// src/models/dashboard.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// =========================================================================
//  LINHAS CRUAS (saída das queries, entrada das derivações)
// =========================================================================

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AgendaEntryRow {
    pub entry_date: NaiveDate,
    pub entry_time: Option<NaiveTime>,
    pub status: String,
    // Rótulo próprio da agenda; quando ausente cai no nome do evento
    pub title: Option<String>,
    pub event_name: String,
    pub client_name: String,
    pub stage_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct QuoteBalanceRow {
    pub quote_id: Uuid,
    pub event_name: String,
    pub client_name: String,
    pub list_price: Decimal,
    pub discount: Decimal,
    /// Soma vitalícia dos pagamentos paid/completed desta cotação.
    pub paid_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ProspectRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub channel_name: Option<String>,
    pub last_event_type: Option<String>,
    pub last_event_stage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StageCountRow {
    pub name: String,
    pub position: i32,
    pub event_count: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AppointmentRow {
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub kind: String,
    pub modality: String,
    pub status: String,
    pub event_name: String,
    pub client_name: String,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct EventTypeCountRow {
    pub name: String,
    pub event_count: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ChannelCountRow {
    pub name: String,
    pub client_count: i64,
}

/// Contagens que alimentam a derivação de PerformanceMetrics.
/// Agregado de várias queries do mesmo fetcher.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerformanceInputs {
    pub quotes_total: i64,
    pub quotes_approved: i64,
    pub events_this_month: i64,
    pub events_last_month: i64,
    /// Tipos de evento do mês, já ordenados por contagem decrescente.
    pub event_type_counts: Vec<EventTypeCountRow>,
    pub appointments_completed: i64,
    pub appointments_total: i64,
    pub top_channel: Option<ChannelCountRow>,
}

// =========================================================================
//  ENTIDADES DERIVADAS (o contrato de saída do dashboard)
// =========================================================================

// 1. Agenda do mês (≤ 10 itens)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyEvent {
    #[schema(value_type = String, format = Date, example = "2025-06-21")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, example = "15:30:00")]
    pub time: Option<NaiveTime>,
    pub status: String,
    pub event_name: String,
    pub client_name: String,
    /// "Sin etapa" quando o evento não tem etapa atribuída.
    pub stage_name: String,
}

// 2. Balanço financeiro
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutstandingQuote {
    pub quote_id: Uuid,
    pub event_name: String,
    pub client_name: String,
    /// Saldo devedor, arredondado para 2 casas.
    #[schema(example = "400.00")]
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinancialBalance {
    /// Soma de (preço − desconto) das cotações aprovadas/autorizadas de
    /// eventos até o fim do mês corrente (inclui meses anteriores).
    #[schema(example = "1450.00")]
    pub total_facturado: Decimal,
    /// Pagamentos paid/completed capturados dentro do mês corrente.
    #[schema(example = "1050.00")]
    pub total_pagado: Decimal,
    pub total_pendiente: Decimal,
    pub porcentaje_pagado: f64,
    pub pendientes: Vec<OutstandingQuote>,
}

// 3. Prospectos novos do mês (≤ 8)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProspectSummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub channel_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_event_type: Option<String>,
    pub last_event_stage: Option<String>,
}

// 4. Distribuição por etapa do pipeline
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageShare {
    pub name: String,
    pub position: i32,
    pub count: i64,
    /// Participação percentual, arredondada a 1 casa.
    #[schema(example = 37.5)]
    pub percentage: f64,
}

// 5. Citas dos próximos 7 dias (≤ 6)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingAppointment {
    #[schema(value_type = String, format = Date, example = "2025-06-18")]
    pub date: NaiveDate,
    #[schema(value_type = String, example = "10:00:00")]
    pub time: NaiveTime,
    pub kind: String,
    pub modality: String,
    pub status: String,
    pub event_name: String,
    pub client_name: String,
    /// true enquanto a cita segue em 'scheduled' (ainda não confirmada).
    pub requiere_confirmacion: bool,
}

// 6. Métricas de desempenho
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    pub current_month: i64,
    pub previous_month: i64,
    /// Variação percentual mês contra mês, 1 casa decimal.
    pub change_pct: f64,
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopEventType {
    pub name: String,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopChannel {
    pub name: String,
    pub new_clients: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Cotações aprovadas ÷ total do mês × 100 (sem arredondamento).
    pub conversion_rate: f64,
    pub avg_closing_days: f64,
    pub top_event_type: Option<TopEventType>,
    pub appointment_effectiveness: f64,
    pub monthly_trend: MonthlyTrend,
    pub top_channel: Option<TopChannel>,
}

// 7. Resumo rápido do cabeçalho
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuickStats {
    #[schema(example = 12)]
    pub active_events: i64,
    pub scheduled_this_month: i64,
    pub new_prospects_this_month: i64,
    pub appointments_this_week: i64,
    /// Proxy simples: pagamentos 'pending' criados há 30 dias ou mais.
    pub overdue_payments: i64,
}

// O snapshot completo, montado pelo composer.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub monthly_events: Vec<MonthlyEvent>,
    pub financial_balance: FinancialBalance,
    pub new_prospects: Vec<ProspectSummary>,
    pub stage_distribution: Vec<StageShare>,
    pub upcoming_appointments: Vec<UpcomingAppointment>,
    pub performance: PerformanceMetrics,
    pub generated_at: DateTime<Utc>,
}
