// src/common/period.rs

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};

/// Janela de datas usada por todos os fetchers do dashboard.
///
/// É uma função pura do instante recebido: nada é cacheado, cada invocação
/// dos accessors resolve a janela de novo. Dentro de um snapshot composto os
/// fetchers leem o relógio quase ao mesmo tempo, então uma pequena deriva
/// entre eles na virada do mês é tolerada pelo contrato.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportingWindow {
    pub month_start: NaiveDate,
    pub month_end: NaiveDate,
    pub last_month_start: NaiveDate,
    pub last_month_end: NaiveDate,
    pub today: NaiveDate,
    /// Hoje + 7 dias corridos (não são dias úteis).
    pub week_end: NaiveDate,
    pub now: DateTime<Utc>,
}

impl ReportingWindow {
    pub fn at(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let month_start = today.with_day(1).expect("dia 1 existe em qualquer mês");
        let month_end = month_start
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .expect("último dia do mês");
        let last_month_end = month_start.pred_opt().expect("véspera do dia 1");
        let last_month_start = last_month_end
            .with_day(1)
            .expect("dia 1 existe em qualquer mês");
        let week_end = today + Duration::days(7);

        Self {
            month_start,
            month_end,
            last_month_start,
            last_month_end,
            today,
            week_end,
            now,
        }
    }

    pub fn current() -> Self {
        Self::at(Utc::now())
    }

    // Limites em timestamp para filtrar colunas created_at.

    pub fn month_start_at(&self) -> DateTime<Utc> {
        start_of_day(self.month_start)
    }

    pub fn month_end_at(&self) -> DateTime<Utc> {
        end_of_day(self.month_end)
    }

    pub fn last_month_start_at(&self) -> DateTime<Utc> {
        start_of_day(self.last_month_start)
    }

    pub fn last_month_end_at(&self) -> DateTime<Utc> {
        end_of_day(self.last_month_end)
    }

    /// Corte do proxy de pagamentos atrasados: agora − 30 dias.
    pub fn overdue_cutoff(&self) -> DateTime<Utc> {
        self.now - Duration::days(30)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(23, 59, 59).expect("hora válida").and_utc()
}
