// src/db/dashboard_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    common::{error::AppError, period::ReportingWindow},
    models::dashboard::{
        AgendaEntryRow, AppointmentRow, ChannelCountRow, EventTypeCountRow, PerformanceInputs,
        ProspectRow, QuickStats, QuoteBalanceRow, StageCountRow,
    },
    services::dashboard_service::DashboardSource,
};

/// As queries por trás dos fetchers do dashboard. Todas são somente-leitura
/// e escopadas ao tenant recebido; cada uma roda na pool sem transação
/// compartilhada, então dois fetchers concorrentes podem observar instantes
/// ligeiramente diferentes se houver escrita simultânea. Janela de
/// inconsistência aceita pelo contrato, não é defeito a corrigir aqui.
#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Contagens de cotações do mês (total e aprovadas).
    async fn quote_counts(
        &self,
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<(i64, i64), AppError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status IN ('approved', 'authorized')) AS approved
            FROM quotes
            WHERE tenant_id = $1 AND created_at BETWEEN $2 AND $3
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok((row.get::<i64, _>("total"), row.get::<i64, _>("approved")))
    }

    // Eventos do mês corrente e do anterior, para a tendência.
    async fn event_counts(
        &self,
        tenant_id: Uuid,
        window: &ReportingWindow,
    ) -> Result<(i64, i64), AppError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) FILTER (WHERE event_date BETWEEN $2 AND $3) AS this_month,
                   COUNT(*) FILTER (WHERE event_date BETWEEN $4 AND $5) AS last_month
            FROM events
            WHERE tenant_id = $1 AND status <> 'cancelled'
            "#,
        )
        .bind(tenant_id)
        .bind(window.month_start)
        .bind(window.month_end)
        .bind(window.last_month_start)
        .bind(window.last_month_end)
        .fetch_one(&self.pool)
        .await?;

        Ok((row.get::<i64, _>("this_month"), row.get::<i64, _>("last_month")))
    }

    async fn event_type_counts(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<EventTypeCountRow>, AppError> {
        let rows = sqlx::query_as::<_, EventTypeCountRow>(
            r#"
            SELECT t.name, COUNT(*) AS event_count
            FROM events e
            JOIN event_types t ON t.id = e.event_type_id
            WHERE e.tenant_id = $1
              AND e.status <> 'archived'
              AND e.event_date BETWEEN $2 AND $3
            GROUP BY t.id, t.name
            ORDER BY event_count DESC, t.name ASC
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // Citas completadas vs. não canceladas do mês (efetividade).
    async fn appointment_counts(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<(i64, i64), AppError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                   COUNT(*) FILTER (WHERE status <> 'cancelled') AS total
            FROM appointments
            WHERE tenant_id = $1 AND appointment_date BETWEEN $2 AND $3
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok((row.get::<i64, _>("completed"), row.get::<i64, _>("total")))
    }

    async fn top_channel(
        &self,
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<ChannelCountRow>, AppError> {
        let row = sqlx::query_as::<_, ChannelCountRow>(
            r#"
            SELECT ch.name, COUNT(*) AS client_count
            FROM clients c
            JOIN acquisition_channels ch ON ch.id = c.channel_id
            WHERE c.tenant_id = $1 AND c.created_at BETWEEN $2 AND $3
            GROUP BY ch.id, ch.name
            ORDER BY client_count DESC, ch.name ASC
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl DashboardSource for DashboardRepository {
    async fn agenda_entries(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AgendaEntryRow>, AppError> {
        let rows = sqlx::query_as::<_, AgendaEntryRow>(
            r#"
            SELECT a.entry_date, a.entry_time, a.status, a.title,
                   e.name AS event_name, c.full_name AS client_name, s.name AS stage_name
            FROM agenda_entries a
            JOIN events e ON e.id = a.event_id
            JOIN clients c ON c.id = e.client_id
            LEFT JOIN pipeline_stages s ON s.id = e.stage_id
            WHERE a.tenant_id = $1
              AND a.status <> 'cancelled'
              AND a.entry_date BETWEEN $2 AND $3
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // Cotações aprovadas/autorizadas de eventos até o fim do mês corrente,
    // com o pago vitalício de cada uma. O recorte "deste mês" dos
    // pagamentos fica em payments_captured, de propósito.
    async fn quote_balances(
        &self,
        tenant_id: Uuid,
        events_up_to: NaiveDate,
    ) -> Result<Vec<QuoteBalanceRow>, AppError> {
        let rows = sqlx::query_as::<_, QuoteBalanceRow>(
            r#"
            SELECT q.id AS quote_id, e.name AS event_name, c.full_name AS client_name,
                   q.list_price, q.discount,
                   COALESCE(SUM(p.amount) FILTER (WHERE p.status IN ('paid', 'completed')), 0) AS paid_total
            FROM quotes q
            JOIN events e ON e.id = q.event_id
            JOIN clients c ON c.id = e.client_id
            LEFT JOIN payments p ON p.quote_id = q.id
            WHERE q.tenant_id = $1
              AND q.status IN ('approved', 'authorized')
              AND e.event_date <= $2
            GROUP BY q.id, e.name, c.full_name
            "#,
        )
        .bind(tenant_id)
        .bind(events_up_to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn payments_captured(
        &self,
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Decimal, AppError> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(amount), 0) AS total
            FROM payments
            WHERE tenant_id = $1
              AND status IN ('paid', 'completed')
              AND created_at BETWEEN $2 AND $3
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn recent_prospects(
        &self,
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ProspectRow>, AppError> {
        // O LATERAL resolve tipo e etapa do evento mais recente do cliente
        // na mesma ida ao banco.
        let rows = sqlx::query_as::<_, ProspectRow>(
            r#"
            SELECT c.id, c.full_name, c.email, c.phone, c.created_at,
                   ch.name AS channel_name,
                   le.type_name AS last_event_type,
                   le.stage_name AS last_event_stage
            FROM clients c
            LEFT JOIN acquisition_channels ch ON ch.id = c.channel_id
            LEFT JOIN LATERAL (
                SELECT t.name AS type_name, s.name AS stage_name
                FROM events e
                LEFT JOIN event_types t ON t.id = e.event_type_id
                LEFT JOIN pipeline_stages s ON s.id = e.stage_id
                WHERE e.client_id = c.id
                ORDER BY e.created_at DESC
                LIMIT 1
            ) le ON TRUE
            WHERE c.tenant_id = $1
              AND c.status IN ('prospect', 'new')
              AND c.created_at BETWEEN $2 AND $3
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn stage_counts(&self, tenant_id: Uuid) -> Result<Vec<StageCountRow>, AppError> {
        let rows = sqlx::query_as::<_, StageCountRow>(
            r#"
            SELECT s.name, s.position, COUNT(e.id) AS event_count
            FROM pipeline_stages s
            LEFT JOIN events e
                   ON e.stage_id = s.id
                  AND e.tenant_id = s.tenant_id
                  AND e.status <> 'archived'
            WHERE s.tenant_id = $1
            GROUP BY s.id, s.name, s.position
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn appointments_between(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AppointmentRow>, AppError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(
            r#"
            SELECT ap.appointment_date, ap.appointment_time, ap.kind, ap.modality, ap.status,
                   e.name AS event_name, c.full_name AS client_name
            FROM appointments ap
            JOIN events e ON e.id = ap.event_id
            JOIN clients c ON c.id = e.client_id
            WHERE ap.tenant_id = $1
              AND ap.status IN ('scheduled', 'confirmed')
              AND ap.appointment_date BETWEEN $2 AND $3
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn performance_inputs(
        &self,
        tenant_id: Uuid,
        window: &ReportingWindow,
    ) -> Result<PerformanceInputs, AppError> {
        let (quotes, events, event_types, appointments, top_channel) = tokio::try_join!(
            self.quote_counts(tenant_id, window.month_start_at(), window.month_end_at()),
            self.event_counts(tenant_id, window),
            self.event_type_counts(tenant_id, window.month_start, window.month_end),
            self.appointment_counts(tenant_id, window.month_start, window.month_end),
            self.top_channel(tenant_id, window.month_start_at(), window.month_end_at()),
        )?;

        Ok(PerformanceInputs {
            quotes_total: quotes.0,
            quotes_approved: quotes.1,
            events_this_month: events.0,
            events_last_month: events.1,
            event_type_counts: event_types,
            appointments_completed: appointments.0,
            appointments_total: appointments.1,
            top_channel,
        })
    }

    async fn quick_stats(
        &self,
        tenant_id: Uuid,
        window: &ReportingWindow,
    ) -> Result<QuickStats, AppError> {
        let stats = sqlx::query_as::<_, QuickStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM events
                  WHERE tenant_id = $1 AND status <> 'archived') AS active_events,
                (SELECT COUNT(*) FROM agenda_entries
                  WHERE tenant_id = $1 AND status <> 'cancelled'
                    AND entry_date BETWEEN $2 AND $3) AS scheduled_this_month,
                (SELECT COUNT(*) FROM clients
                  WHERE tenant_id = $1 AND status IN ('prospect', 'new')
                    AND created_at BETWEEN $4 AND $5) AS new_prospects_this_month,
                (SELECT COUNT(*) FROM appointments
                  WHERE tenant_id = $1 AND status IN ('scheduled', 'confirmed')
                    AND appointment_date BETWEEN $6 AND $7) AS appointments_this_week,
                (SELECT COUNT(*) FROM payments
                  WHERE tenant_id = $1 AND status = 'pending'
                    AND created_at <= $8) AS overdue_payments
            "#,
        )
        .bind(tenant_id)
        .bind(window.month_start)
        .bind(window.month_end)
        .bind(window.month_start_at())
        .bind(window.month_end_at())
        .bind(window.today)
        .bind(window.week_end)
        .bind(window.overdue_cutoff())
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
