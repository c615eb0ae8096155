// src/services/metrics.rs
//
// Funções puras de derivação do dashboard: recebem as linhas cruas dos
// fetchers e produzem as entidades de saída. Nenhuma toca banco ou relógio,
// o que mantém toda a aritmética testável em memória.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::dashboard::{
    AgendaEntryRow, AppointmentRow, FinancialBalance, MonthlyEvent, MonthlyTrend,
    OutstandingQuote, PerformanceInputs, PerformanceMetrics, ProspectRow, ProspectSummary,
    QuoteBalanceRow, StageCountRow, StageShare, TopChannel, TopEventType, TrendDirection,
    UpcomingAppointment,
};

// Tetos de cada lista do dashboard.
pub const MONTHLY_EVENTS_CAP: usize = 10;
pub const PROSPECTS_CAP: usize = 8;
pub const APPOINTMENTS_CAP: usize = 6;

/// Saldo abaixo deste valor não entra na lista de pendências: filtra ruído
/// de ponto flutuante do pipeline de preços, não é regra de negócio.
/// Assume moeda com 2 casas decimais.
pub const DEFAULT_BALANCE_NOISE_THRESHOLD: Decimal = Decimal::ONE;

/// Tempo médio de fechamento em dias. Valor fixo: o modelo de dados ainda
/// não guarda o instante de aprovação da cotação.
// TODO: calcular a partir de quotes.approved_at quando a coluna existir.
pub const AVG_CLOSING_DAYS_PLACEHOLDER: f64 = 15.0;

const STAGE_NAME_FALLBACK: &str = "Sin etapa";

// =========================================================================
//  RESOLUÇÃO DE NOMES (fallbacks definidos num lugar só)
// =========================================================================

pub fn resolve_event_label(title: Option<&str>, event_name: &str) -> String {
    match title {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => event_name.to_string(),
    }
}

pub fn resolve_stage_name(stage_name: Option<String>) -> String {
    stage_name
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| STAGE_NAME_FALLBACK.to_string())
}

// =========================================================================
//  ARREDONDAMENTO
// =========================================================================

/// Valores monetários: 2 casas.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Percentuais exibidos (distribuição, tendência): 1 casa.
/// Taxa de conversão e porcentaje_pagado ficam sem arredondar.
pub fn round_pct(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// =========================================================================
//  1. AGENDA DO MÊS
// =========================================================================

pub fn monthly_events(mut rows: Vec<AgendaEntryRow>) -> Vec<MonthlyEvent> {
    rows.sort_by(|a, b| (a.entry_date, a.entry_time).cmp(&(b.entry_date, b.entry_time)));
    rows.into_iter()
        .take(MONTHLY_EVENTS_CAP)
        .map(|r| MonthlyEvent {
            date: r.entry_date,
            time: r.entry_time,
            event_name: resolve_event_label(r.title.as_deref(), &r.event_name),
            client_name: r.client_name,
            stage_name: resolve_stage_name(r.stage_name),
            status: r.status,
        })
        .collect()
}

// =========================================================================
//  2. BALANÇO FINANCEIRO
// =========================================================================

pub fn outstanding_balance(list_price: Decimal, discount: Decimal, paid: Decimal) -> Decimal {
    (list_price - discount - paid).max(Decimal::ZERO)
}

pub fn percent_paid(total_paid: Decimal, total_invoiced: Decimal) -> f64 {
    if total_invoiced.is_zero() {
        return 0.0;
    }
    ((total_paid / total_invoiced) * Decimal::ONE_HUNDRED)
        .to_f64()
        .unwrap_or(0.0)
}

/// `rows` traz as cotações aprovadas/autorizadas com o pago vitalício de
/// cada uma; `paid_this_month` vem de um filtro de tempo diferente (só o
/// mês corrente). Os dois recortes são intencionais e não podem ser
/// unificados.
pub fn financial_balance(
    rows: Vec<QuoteBalanceRow>,
    paid_this_month: Decimal,
    noise_threshold: Decimal,
) -> FinancialBalance {
    let mut total_facturado = Decimal::ZERO;
    let mut pendientes = Vec::new();

    for row in rows {
        total_facturado += row.list_price - row.discount;

        let balance = outstanding_balance(row.list_price, row.discount, row.paid_total);
        if balance > noise_threshold {
            pendientes.push(OutstandingQuote {
                quote_id: row.quote_id,
                event_name: row.event_name,
                client_name: row.client_name,
                balance: round_currency(balance),
            });
        }
    }

    // Soma dos itens já arredondados: o total bate com a lista exibida.
    let total_pendiente: Decimal = pendientes.iter().map(|p| p.balance).sum();

    FinancialBalance {
        porcentaje_pagado: percent_paid(paid_this_month, total_facturado),
        total_facturado,
        total_pagado: paid_this_month,
        total_pendiente,
        pendientes,
    }
}

// =========================================================================
//  3. PROSPECTOS NOVOS
// =========================================================================

pub fn new_prospects(mut rows: Vec<ProspectRow>) -> Vec<ProspectSummary> {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows.into_iter()
        .take(PROSPECTS_CAP)
        .map(|r| ProspectSummary {
            id: r.id,
            full_name: r.full_name,
            email: r.email,
            phone: r.phone,
            channel_name: r.channel_name,
            created_at: r.created_at,
            last_event_type: r.last_event_type,
            last_event_stage: r.last_event_stage,
        })
        .collect()
}

// =========================================================================
//  4. DISTRIBUIÇÃO POR ETAPA
// =========================================================================

/// Etapas com zero eventos qualificados saem do resultado (não viram 0%).
pub fn stage_distribution(mut rows: Vec<StageCountRow>) -> Vec<StageShare> {
    rows.sort_by_key(|r| r.position);

    let total: i64 = rows.iter().map(|r| r.event_count).sum();
    if total == 0 {
        return Vec::new();
    }

    rows.into_iter()
        .filter(|r| r.event_count > 0)
        .map(|r| StageShare {
            percentage: round_pct(r.event_count as f64 / total as f64 * 100.0),
            name: r.name,
            position: r.position,
            count: r.event_count,
        })
        .collect()
}

// =========================================================================
//  5. CITAS DOS PRÓXIMOS 7 DIAS
// =========================================================================

pub fn upcoming_appointments(mut rows: Vec<AppointmentRow>) -> Vec<UpcomingAppointment> {
    rows.sort_by(|a, b| {
        (a.appointment_date, a.appointment_time).cmp(&(b.appointment_date, b.appointment_time))
    });
    rows.into_iter()
        .take(APPOINTMENTS_CAP)
        .map(|r| {
            let requiere_confirmacion = r.status == "scheduled";
            UpcomingAppointment {
                date: r.appointment_date,
                time: r.appointment_time,
                kind: r.kind,
                modality: r.modality,
                status: r.status,
                event_name: r.event_name,
                client_name: r.client_name,
                requiere_confirmacion,
            }
        })
        .collect()
}

// =========================================================================
//  6. MÉTRICAS DE DESEMPENHO
// =========================================================================

pub fn conversion_rate(approved: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    approved as f64 / total as f64 * 100.0
}

/// Classifica a variação mês contra mês. Limiares estritos: exatamente
/// ±5% ainda é `stable`; mês anterior zerado também.
pub fn classify_trend(current: i64, previous: i64) -> MonthlyTrend {
    let change = if previous == 0 {
        0.0
    } else {
        (current - previous) as f64 / previous as f64 * 100.0
    };

    let direction = if previous == 0 {
        TrendDirection::Stable
    } else if change > 5.0 {
        TrendDirection::Up
    } else if change < -5.0 {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };

    MonthlyTrend {
        current_month: current,
        previous_month: previous,
        change_pct: round_pct(change),
        direction,
    }
}

pub fn performance_metrics(inputs: PerformanceInputs) -> PerformanceMetrics {
    let counted: i64 = inputs.event_type_counts.iter().map(|r| r.event_count).sum();
    // As linhas chegam ordenadas por contagem decrescente; a primeira é o top.
    let top_event_type = inputs.event_type_counts.first().map(|top| TopEventType {
        name: top.name.clone(),
        share: if counted == 0 {
            0.0
        } else {
            round_pct(top.event_count as f64 / counted as f64 * 100.0)
        },
    });

    let appointment_effectiveness = if inputs.appointments_total == 0 {
        0.0
    } else {
        inputs.appointments_completed as f64 / inputs.appointments_total as f64 * 100.0
    };

    PerformanceMetrics {
        conversion_rate: conversion_rate(inputs.quotes_approved, inputs.quotes_total),
        avg_closing_days: AVG_CLOSING_DAYS_PLACEHOLDER,
        top_event_type,
        appointment_effectiveness,
        monthly_trend: classify_trend(inputs.events_this_month, inputs.events_last_month),
        top_channel: inputs.top_channel.map(|c| TopChannel {
            name: c.name,
            new_clients: c.client_count,
        }),
    }
}

// =========================================================================
//  TESTES
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dashboard::{ChannelCountRow, EventTypeCountRow};
    use chrono::{Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn time(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn quote_row(price: &str, discount: &str, paid: &str) -> QuoteBalanceRow {
        QuoteBalanceRow {
            quote_id: Uuid::new_v4(),
            event_name: "XV Valentina".to_string(),
            client_name: "Familia Rojas".to_string(),
            list_price: dec(price),
            discount: dec(discount),
            paid_total: dec(paid),
        }
    }

    fn agenda_row(d: u32, h: u32) -> AgendaEntryRow {
        AgendaEntryRow {
            entry_date: date(d),
            entry_time: Some(time(h)),
            status: "scheduled".to_string(),
            title: None,
            event_name: "Boda Torres".to_string(),
            client_name: "Ana Torres".to_string(),
            stage_name: Some("Producción".to_string()),
        }
    }

    fn appointment_row(d: u32, h: u32, status: &str) -> AppointmentRow {
        AppointmentRow {
            appointment_date: date(d),
            appointment_time: time(h),
            kind: "sesion".to_string(),
            modality: "presencial".to_string(),
            status: status.to_string(),
            event_name: "Boda Torres".to_string(),
            client_name: "Ana Torres".to_string(),
        }
    }

    fn prospect_row(day: u32) -> ProspectRow {
        ProspectRow {
            id: Uuid::new_v4(),
            full_name: "Prospecto".to_string(),
            email: None,
            phone: None,
            created_at: Utc.with_ymd_and_hms(2025, 6, day, 10, 0, 0).unwrap(),
            channel_name: Some("Instagram".to_string()),
            last_event_type: None,
            last_event_stage: None,
        }
    }

    fn stage_row(name: &str, position: i32, count: i64) -> StageCountRow {
        StageCountRow {
            name: name.to_string(),
            position,
            event_count: count,
        }
    }

    // --- Limiar de ruído do saldo ---

    #[test]
    fn saldo_logo_acima_do_limiar_entra_arredondado() {
        // 100.004 − 99.00 = 1.004 > 1.0 → entra como 1.00
        let balance = financial_balance(
            vec![quote_row("100.004", "0", "99.00")],
            Decimal::ZERO,
            DEFAULT_BALANCE_NOISE_THRESHOLD,
        );
        assert_eq!(balance.pendientes.len(), 1);
        assert_eq!(balance.pendientes[0].balance, dec("1.00"));
        assert_eq!(balance.total_pendiente, dec("1.00"));
    }

    #[test]
    fn saldo_dentro_do_limiar_fica_de_fora() {
        // 100.004 − 99.01 = 0.994 ≤ 1.0 → ruído, não aparece
        let balance = financial_balance(
            vec![quote_row("100.004", "0", "99.01")],
            Decimal::ZERO,
            DEFAULT_BALANCE_NOISE_THRESHOLD,
        );
        assert!(balance.pendientes.is_empty());
        assert_eq!(balance.total_pendiente, Decimal::ZERO);
    }

    #[test]
    fn saldo_exatamente_no_limiar_fica_de_fora() {
        let balance = financial_balance(
            vec![quote_row("100.00", "0", "99.00")],
            Decimal::ZERO,
            DEFAULT_BALANCE_NOISE_THRESHOLD,
        );
        assert!(balance.pendientes.is_empty());
    }

    #[test]
    fn pagamento_acima_do_preco_nao_gera_saldo_negativo() {
        assert_eq!(
            outstanding_balance(dec("100"), dec("0"), dec("150")),
            Decimal::ZERO
        );
    }

    // --- Divisão por zero ---

    #[test]
    fn porcentaje_pagado_sem_faturamento_e_zero() {
        let balance = financial_balance(vec![], dec("50"), DEFAULT_BALANCE_NOISE_THRESHOLD);
        assert_eq!(balance.porcentaje_pagado, 0.0);
        assert!(balance.porcentaje_pagado.is_finite());
    }

    #[test]
    fn conversao_sem_cotacoes_e_zero() {
        assert_eq!(conversion_rate(0, 0), 0.0);
    }

    // --- Distribuição por etapa ---

    #[test]
    fn distribuicao_soma_perto_de_cem() {
        let shares = stage_distribution(vec![
            stage_row("Contacto", 1, 1),
            stage_row("Cotización", 2, 1),
            stage_row("Producción", 3, 1),
        ]);
        let sum: f64 = shares.iter().map(|s| s.percentage).sum();
        assert!((sum - 100.0).abs() <= 3.0 * 0.05, "soma foi {sum}");
    }

    #[test]
    fn etapa_sem_eventos_e_omitida() {
        let shares = stage_distribution(vec![
            stage_row("Contacto", 1, 3),
            stage_row("Cotización", 2, 0),
            stage_row("Entrega", 4, 1),
        ]);
        assert_eq!(shares.len(), 2);
        assert!(shares.iter().all(|s| s.name != "Cotización"));
        assert_eq!(shares[0].percentage, 75.0);
        assert_eq!(shares[1].percentage, 25.0);
    }

    #[test]
    fn distribuicao_ordena_por_posicao() {
        let shares = stage_distribution(vec![
            stage_row("Entrega", 4, 1),
            stage_row("Contacto", 1, 1),
            stage_row("Producción", 3, 2),
        ]);
        let names: Vec<&str> = shares.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Contacto", "Producción", "Entrega"]);
    }

    #[test]
    fn distribuicao_vazia_sem_eventos() {
        assert!(stage_distribution(vec![stage_row("Contacto", 1, 0)]).is_empty());
        assert!(stage_distribution(vec![]).is_empty());
    }

    // --- Classificação de tendência ---

    #[test]
    fn variacao_de_exatamente_cinco_por_cento_e_estavel() {
        assert_eq!(classify_trend(105, 100).direction, TrendDirection::Stable);
        assert_eq!(classify_trend(95, 100).direction, TrendDirection::Stable);
    }

    #[test]
    fn variacao_acima_de_cinco_sobe_abaixo_desce() {
        assert_eq!(classify_trend(10501, 10000).direction, TrendDirection::Up);
        assert_eq!(classify_trend(9499, 10000).direction, TrendDirection::Down);
    }

    #[test]
    fn mes_anterior_zerado_e_estavel() {
        let trend = classify_trend(7, 0);
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.change_pct, 0.0);
    }

    #[test]
    fn variacao_exibida_com_uma_casa() {
        // 7/30 = 23.333...% → 23.3
        assert_eq!(classify_trend(37, 30).change_pct, 23.3);
    }

    // --- Tetos e ordenação das listas ---

    #[test]
    fn agenda_respeita_teto_de_dez_em_ordem_cronologica() {
        let rows: Vec<AgendaEntryRow> =
            (1..=15).rev().map(|d| agenda_row(d, 9)).collect();
        let events = monthly_events(rows);
        assert_eq!(events.len(), MONTHLY_EVENTS_CAP);
        let days: Vec<u32> = events.iter().map(|e| e.date.day()).collect();
        assert_eq!(days, (1..=10).collect::<Vec<u32>>());
    }

    #[test]
    fn agenda_desempata_pelo_horario() {
        let mut rows = vec![agenda_row(5, 16), agenda_row(5, 9), agenda_row(4, 20)];
        rows[0].client_name = "tarde".to_string();
        rows[1].client_name = "manhã".to_string();
        let events = monthly_events(rows);
        assert_eq!(events[0].date, date(4));
        assert_eq!(events[1].client_name, "manhã");
        assert_eq!(events[2].client_name, "tarde");
    }

    #[test]
    fn prospectos_respeitam_teto_de_oito_mais_recentes_primeiro() {
        let rows: Vec<ProspectRow> = (1..=12).map(prospect_row).collect();
        let prospects = new_prospects(rows);
        assert_eq!(prospects.len(), PROSPECTS_CAP);
        let days: Vec<u32> = prospects
            .iter()
            .map(|p| p.created_at.date_naive().day())
            .collect();
        assert_eq!(days, (5..=12).rev().collect::<Vec<u32>>());
    }

    #[test]
    fn citas_respeitam_teto_de_seis_em_ordem_cronologica() {
        let rows: Vec<AppointmentRow> = (1..=9)
            .rev()
            .map(|d| appointment_row(d, 10, "confirmed"))
            .collect();
        let citas = upcoming_appointments(rows);
        assert_eq!(citas.len(), APPOINTMENTS_CAP);
        assert_eq!(citas[0].date, date(1));
        assert_eq!(citas[5].date, date(6));
    }

    #[test]
    fn cita_scheduled_requer_confirmacao() {
        let citas = upcoming_appointments(vec![
            appointment_row(3, 10, "scheduled"),
            appointment_row(3, 11, "confirmed"),
        ]);
        assert!(citas[0].requiere_confirmacion);
        assert!(!citas[1].requiere_confirmacion);
    }

    // --- Fallbacks de exibição ---

    #[test]
    fn agenda_sem_titulo_usa_nome_do_evento() {
        assert_eq!(resolve_event_label(None, "Boda Torres"), "Boda Torres");
        assert_eq!(resolve_event_label(Some("  "), "Boda Torres"), "Boda Torres");
        assert_eq!(resolve_event_label(Some("Sesión previa"), "Boda Torres"), "Sesión previa");
    }

    #[test]
    fn evento_sem_etapa_usa_sentinela() {
        assert_eq!(resolve_stage_name(None), "Sin etapa");
        assert_eq!(resolve_stage_name(Some(String::new())), "Sin etapa");
        assert_eq!(resolve_stage_name(Some("Entrega".to_string())), "Entrega");
    }

    // --- Cenário ponta a ponta do balanço ---

    #[test]
    fn balanco_usa_recortes_de_tempo_distintos() {
        // Duas cotações aprovadas (deste mês ou anteriores): o faturado soma
        // as duas; o pago do mês vem de um filtro separado.
        let rows = vec![
            quote_row("1000", "0", "600"),
            quote_row("500", "50", "450"),
        ];
        let balance = financial_balance(rows, dec("1050"), DEFAULT_BALANCE_NOISE_THRESHOLD);

        assert_eq!(balance.total_facturado, dec("1450"));
        assert_eq!(balance.total_pagado, dec("1050"));
        // Só a primeira cotação tem saldo: 1000 − 600 = 400
        assert_eq!(balance.pendientes.len(), 1);
        assert_eq!(balance.pendientes[0].balance, dec("400.00"));
        assert_eq!(balance.total_pendiente, dec("400.00"));
        let expected = 1050.0 / 1450.0 * 100.0;
        assert!((balance.porcentaje_pagado - expected).abs() < 1e-9);
    }

    // --- Métricas de desempenho ---

    #[test]
    fn conversao_fica_sem_arredondar() {
        let rate = conversion_rate(1, 3);
        assert!((rate - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn tipo_de_evento_mais_popular_com_participacao() {
        let metrics = performance_metrics(PerformanceInputs {
            event_type_counts: vec![
                EventTypeCountRow { name: "XV Años".to_string(), event_count: 5 },
                EventTypeCountRow { name: "Boda".to_string(), event_count: 3 },
            ],
            ..Default::default()
        });
        let top = metrics.top_event_type.unwrap();
        assert_eq!(top.name, "XV Años");
        assert_eq!(top.share, 62.5);
    }

    #[test]
    fn efetividade_de_citas_sem_citas_e_zero() {
        let metrics = performance_metrics(PerformanceInputs::default());
        assert_eq!(metrics.appointment_effectiveness, 0.0);
        assert!(metrics.top_event_type.is_none());
        assert!(metrics.top_channel.is_none());
    }

    #[test]
    fn fechamento_medio_segue_como_placeholder() {
        let metrics = performance_metrics(PerformanceInputs::default());
        assert_eq!(metrics.avg_closing_days, AVG_CLOSING_DAYS_PLACEHOLDER);
    }

    #[test]
    fn canal_lider_passa_pela_derivacao() {
        let metrics = performance_metrics(PerformanceInputs {
            top_channel: Some(ChannelCountRow {
                name: "Instagram".to_string(),
                client_count: 4,
            }),
            ..Default::default()
        });
        let channel = metrics.top_channel.unwrap();
        assert_eq!(channel.name, "Instagram");
        assert_eq!(channel.new_clients, 4);
    }
}
