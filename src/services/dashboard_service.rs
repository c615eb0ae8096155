// src/services/dashboard_service.rs

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{error::AppError, period::ReportingWindow},
    db::DashboardRepository,
    models::dashboard::{
        AgendaEntryRow, AppointmentRow, DashboardSnapshot, FinancialBalance, MonthlyEvent,
        PerformanceInputs, PerformanceMetrics, ProspectRow, ProspectSummary, QuickStats,
        QuoteBalanceRow, StageCountRow, StageShare, UpcomingAppointment,
    },
    services::metrics,
};

/// O contrato de cada fetcher: leitura escopada ao tenant, janela explícita,
/// nenhuma mutação. O repositório Postgres é a implementação de produção;
/// os testes usam um dublê em memória.
#[async_trait]
pub trait DashboardSource: Send + Sync {
    async fn agenda_entries(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AgendaEntryRow>, AppError>;

    async fn quote_balances(
        &self,
        tenant_id: Uuid,
        events_up_to: NaiveDate,
    ) -> Result<Vec<QuoteBalanceRow>, AppError>;

    async fn payments_captured(
        &self,
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Decimal, AppError>;

    async fn recent_prospects(
        &self,
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ProspectRow>, AppError>;

    async fn stage_counts(&self, tenant_id: Uuid) -> Result<Vec<StageCountRow>, AppError>;

    async fn appointments_between(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AppointmentRow>, AppError>;

    async fn performance_inputs(
        &self,
        tenant_id: Uuid,
        window: &ReportingWindow,
    ) -> Result<PerformanceInputs, AppError>;

    async fn quick_stats(
        &self,
        tenant_id: Uuid,
        window: &ReportingWindow,
    ) -> Result<QuickStats, AppError>;
}

#[derive(Clone)]
pub struct DashboardService<S = DashboardRepository> {
    source: S,
    // Época de invalidação por tenant; alimenta o ETag do snapshot para a
    // camada de apresentação refazer o fetch depois de uma mutação.
    epochs: Arc<RwLock<HashMap<Uuid, u64>>>,
}

impl<S: DashboardSource> DashboardService<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            epochs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    // Cada accessor resolve a janela de novo a cada chamada: dentro de um
    // snapshot os seis leem o relógio quase ao mesmo tempo, e uma pequena
    // deriva na virada do mês é tolerada pelo contrato.

    pub async fn monthly_events(&self, tenant_id: Uuid) -> Result<Vec<MonthlyEvent>, AppError> {
        let window = ReportingWindow::current();
        let rows = self
            .source
            .agenda_entries(tenant_id, window.month_start, window.month_end)
            .await?;
        Ok(metrics::monthly_events(rows))
    }

    pub async fn financial_balance(&self, tenant_id: Uuid) -> Result<FinancialBalance, AppError> {
        let window = ReportingWindow::current();
        // Dois recortes de tempo distintos: o faturado considera eventos até
        // o fim do mês (inclui meses passados); o pago só o mês corrente.
        let (quotes, paid_this_month) = tokio::try_join!(
            self.source.quote_balances(tenant_id, window.month_end),
            self.source
                .payments_captured(tenant_id, window.month_start_at(), window.month_end_at()),
        )?;
        Ok(metrics::financial_balance(
            quotes,
            paid_this_month,
            metrics::DEFAULT_BALANCE_NOISE_THRESHOLD,
        ))
    }

    pub async fn new_prospects(&self, tenant_id: Uuid) -> Result<Vec<ProspectSummary>, AppError> {
        let window = ReportingWindow::current();
        let rows = self
            .source
            .recent_prospects(tenant_id, window.month_start_at(), window.month_end_at())
            .await?;
        Ok(metrics::new_prospects(rows))
    }

    pub async fn stage_distribution(&self, tenant_id: Uuid) -> Result<Vec<StageShare>, AppError> {
        let rows = self.source.stage_counts(tenant_id).await?;
        Ok(metrics::stage_distribution(rows))
    }

    pub async fn upcoming_appointments(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<UpcomingAppointment>, AppError> {
        let window = ReportingWindow::current();
        let rows = self
            .source
            .appointments_between(tenant_id, window.today, window.week_end)
            .await?;
        Ok(metrics::upcoming_appointments(rows))
    }

    pub async fn performance(&self, tenant_id: Uuid) -> Result<PerformanceMetrics, AppError> {
        let window = ReportingWindow::current();
        let inputs = self.source.performance_inputs(tenant_id, &window).await?;
        Ok(metrics::performance_metrics(inputs))
    }

    pub async fn quick_stats(&self, tenant_id: Uuid) -> Result<QuickStats, AppError> {
        let window = ReportingWindow::current();
        self.source.quick_stats(tenant_id, &window).await
    }

    /// Dispara os seis fetchers concorrentemente e monta o snapshot.
    /// Tudo ou nada: se qualquer fetcher falhar, o chamador recebe um único
    /// erro genérico e nenhum resultado parcial. A causa original fica no log.
    pub async fn compose_snapshot(&self, tenant_id: Uuid) -> Result<DashboardSnapshot, AppError> {
        let joined = tokio::try_join!(
            self.monthly_events(tenant_id),
            self.financial_balance(tenant_id),
            self.new_prospects(tenant_id),
            self.stage_distribution(tenant_id),
            self.upcoming_appointments(tenant_id),
            self.performance(tenant_id),
        );

        match joined {
            Ok((
                monthly_events,
                financial_balance,
                new_prospects,
                stage_distribution,
                upcoming_appointments,
                performance,
            )) => Ok(DashboardSnapshot {
                monthly_events,
                financial_balance,
                new_prospects,
                stage_distribution,
                upcoming_appointments,
                performance,
                generated_at: Utc::now(),
            }),
            Err(err) => {
                tracing::error!(%tenant_id, "Falha ao compor o snapshot do dashboard: {err}");
                Err(AppError::DashboardUnavailable)
            }
        }
    }

    // =====================================================================
    //  GANCHO DE INVALIDAÇÃO
    // =====================================================================

    /// Avança a época do tenant depois de uma mutação nos dados de origem.
    pub fn invalidate(&self, tenant_id: Uuid) -> u64 {
        let mut epochs = self.epochs.write().expect("lock de épocas");
        let epoch = epochs.entry(tenant_id).or_insert(0);
        *epoch += 1;
        *epoch
    }

    pub fn cache_epoch(&self, tenant_id: Uuid) -> u64 {
        self.epochs
            .read()
            .expect("lock de épocas")
            .get(&tenant_id)
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dashboard::TrendDirection;
    use chrono::NaiveTime;

    // Dublê em memória do DashboardSource. `broken_fetcher` derruba um
    // único fetcher para exercitar o caminho tudo-ou-nada.
    struct InMemorySource {
        broken_fetcher: Option<&'static str>,
        agenda: Vec<AgendaEntryRow>,
        quotes: Vec<QuoteBalanceRow>,
        paid_this_month: Decimal,
        prospects: Vec<ProspectRow>,
        stages: Vec<StageCountRow>,
        appointments: Vec<AppointmentRow>,
        performance: PerformanceInputs,
        stats: QuickStats,
    }

    impl InMemorySource {
        fn fixture() -> Self {
            let today = Utc::now().date_naive();
            Self {
                broken_fetcher: None,
                agenda: vec![AgendaEntryRow {
                    entry_date: today,
                    entry_time: NaiveTime::from_hms_opt(10, 0, 0),
                    status: "confirmed".to_string(),
                    title: None,
                    event_name: "Boda Torres".to_string(),
                    client_name: "Ana Torres".to_string(),
                    stage_name: None,
                }],
                quotes: vec![QuoteBalanceRow {
                    quote_id: Uuid::new_v4(),
                    event_name: "Boda Torres".to_string(),
                    client_name: "Ana Torres".to_string(),
                    list_price: "1000".parse().unwrap(),
                    discount: Decimal::ZERO,
                    paid_total: "600".parse().unwrap(),
                }],
                paid_this_month: "600".parse().unwrap(),
                prospects: vec![],
                stages: vec![
                    StageCountRow {
                        name: "Contacto".to_string(),
                        position: 1,
                        event_count: 3,
                    },
                    StageCountRow {
                        name: "Producción".to_string(),
                        position: 2,
                        event_count: 1,
                    },
                ],
                appointments: vec![],
                performance: PerformanceInputs {
                    quotes_total: 4,
                    quotes_approved: 2,
                    events_this_month: 6,
                    events_last_month: 5,
                    ..Default::default()
                },
                stats: QuickStats {
                    active_events: 4,
                    scheduled_this_month: 1,
                    new_prospects_this_month: 0,
                    appointments_this_week: 0,
                    overdue_payments: 2,
                },
            }
        }

        fn fail(&self, fetcher: &'static str) -> Result<(), AppError> {
            if self.broken_fetcher == Some(fetcher) {
                return Err(AppError::InternalServerError(anyhow::anyhow!(
                    "query quebrada: {fetcher}"
                )));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DashboardSource for InMemorySource {
        async fn agenda_entries(
            &self,
            _tenant_id: Uuid,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<AgendaEntryRow>, AppError> {
            self.fail("agenda")?;
            Ok(self.agenda.clone())
        }

        async fn quote_balances(
            &self,
            _tenant_id: Uuid,
            _events_up_to: NaiveDate,
        ) -> Result<Vec<QuoteBalanceRow>, AppError> {
            self.fail("quotes")?;
            Ok(self.quotes.clone())
        }

        async fn payments_captured(
            &self,
            _tenant_id: Uuid,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> Result<Decimal, AppError> {
            self.fail("payments")?;
            Ok(self.paid_this_month)
        }

        async fn recent_prospects(
            &self,
            _tenant_id: Uuid,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> Result<Vec<ProspectRow>, AppError> {
            self.fail("prospects")?;
            Ok(self.prospects.clone())
        }

        async fn stage_counts(&self, _tenant_id: Uuid) -> Result<Vec<StageCountRow>, AppError> {
            self.fail("stages")?;
            Ok(self.stages.clone())
        }

        async fn appointments_between(
            &self,
            _tenant_id: Uuid,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<AppointmentRow>, AppError> {
            self.fail("appointments")?;
            Ok(self.appointments.clone())
        }

        async fn performance_inputs(
            &self,
            _tenant_id: Uuid,
            _window: &ReportingWindow,
        ) -> Result<PerformanceInputs, AppError> {
            self.fail("performance")?;
            Ok(self.performance.clone())
        }

        async fn quick_stats(
            &self,
            _tenant_id: Uuid,
            _window: &ReportingWindow,
        ) -> Result<QuickStats, AppError> {
            self.fail("quick_stats")?;
            Ok(self.stats.clone())
        }
    }

    #[tokio::test]
    async fn snapshot_completo_com_fonte_saudavel() {
        let service = DashboardService::new(InMemorySource::fixture());
        let snapshot = service.compose_snapshot(Uuid::new_v4()).await.unwrap();

        assert_eq!(snapshot.monthly_events.len(), 1);
        assert_eq!(snapshot.monthly_events[0].stage_name, "Sin etapa");
        assert_eq!(
            snapshot.financial_balance.total_facturado,
            "1000".parse::<Decimal>().unwrap()
        );
        assert_eq!(snapshot.stage_distribution.len(), 2);
        assert_eq!(
            snapshot.performance.monthly_trend.direction,
            TrendDirection::Up
        );
    }

    #[tokio::test]
    async fn qualquer_fetcher_quebrado_derruba_o_snapshot_inteiro() {
        for fetcher in ["agenda", "quotes", "payments", "prospects", "stages", "appointments", "performance"] {
            let mut source = InMemorySource::fixture();
            source.broken_fetcher = Some(fetcher);
            let service = DashboardService::new(source);

            let err = service
                .compose_snapshot(Uuid::new_v4())
                .await
                .expect_err("o snapshot deveria falhar");
            // Um único erro genérico, sem resultado parcial de nenhuma seção.
            assert!(matches!(err, AppError::DashboardUnavailable), "fetcher {fetcher}");
        }
    }

    #[tokio::test]
    async fn snapshots_consecutivos_sao_equivalentes_exceto_o_timestamp() {
        let service = DashboardService::new(InMemorySource::fixture());
        let tenant = Uuid::new_v4();

        let first = service.compose_snapshot(tenant).await.unwrap();
        let second = service.compose_snapshot(tenant).await.unwrap();

        assert_eq!(first.monthly_events, second.monthly_events);
        assert_eq!(first.financial_balance, second.financial_balance);
        assert_eq!(first.new_prospects, second.new_prospects);
        assert_eq!(first.stage_distribution, second.stage_distribution);
        assert_eq!(first.upcoming_appointments, second.upcoming_appointments);
        assert_eq!(first.performance, second.performance);
        assert!(first.generated_at <= second.generated_at);
    }

    #[tokio::test]
    async fn quick_stats_e_independente_do_snapshot() {
        let service = DashboardService::new(InMemorySource::fixture());
        let stats = service.quick_stats(Uuid::new_v4()).await.unwrap();
        assert_eq!(stats.active_events, 4);
        assert_eq!(stats.overdue_payments, 2);
    }

    #[test]
    fn invalidacao_avanca_a_epoca_por_tenant() {
        let service = DashboardService::new(InMemorySource::fixture());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(service.cache_epoch(a), 0);
        assert_eq!(service.invalidate(a), 1);
        assert_eq!(service.invalidate(a), 2);
        assert_eq!(service.cache_epoch(a), 2);
        // Tenants não compartilham época.
        assert_eq!(service.cache_epoch(b), 0);
    }
}
