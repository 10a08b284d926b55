// =============================================================================
// Summarizer — MarketSnapshot => Portuguese report text
// =============================================================================

use std::fmt::Write;

use crate::analysis::divergence::DivergenceKind;
use crate::analysis::levels::LevelKind;
use crate::analysis::trend::{Crossover, TrendDirection, TrendSnapshot, TrendStrength};
use crate::snapshot::{AtrClass, MarketSnapshot};

/// Human label of a trend reading, e.g. "alta forte" or "lateral".
pub fn trend_label(trend: &TrendSnapshot) -> &'static str {
    match (trend.direction, trend.strength) {
        (TrendDirection::Uptrend, TrendStrength::Strong) => "alta forte",
        (TrendDirection::Uptrend, TrendStrength::Moderate) => "alta moderada",
        (TrendDirection::Uptrend, TrendStrength::None) => "alta fraca",
        (TrendDirection::Downtrend, TrendStrength::Strong) => "baixa forte",
        (TrendDirection::Downtrend, TrendStrength::Moderate) => "baixa moderada",
        (TrendDirection::Downtrend, TrendStrength::None) => "baixa fraca",
        (TrendDirection::Sideways, _) => "lateral",
    }
}

fn crossover_label(crossover: Crossover) -> &'static str {
    match crossover {
        Crossover::BullishStack => "empilhamento de alta",
        Crossover::BearishStack => "empilhamento de baixa",
        Crossover::Mixed => "médias misturadas",
    }
}

fn atr_label(class: AtrClass) -> &'static str {
    match class {
        AtrClass::Low => "baixa",
        AtrClass::Moderate => "moderada",
        AtrClass::High => "alta",
    }
}

fn prices(values: &[f64]) -> String {
    if values.is_empty() {
        return "nenhum".to_string();
    }
    values
        .iter()
        .map(|p| format!("{p:.2}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render `snapshot` as a short multi-line report.
pub fn summarise(snapshot: &MarketSnapshot) -> String {
    let mut out = String::new();
    let t = &snapshot.trend_daily;

    let _ = writeln!(
        out,
        "Resumo de Mercado: {} em {} (fechamento {:.2})",
        snapshot.symbol, snapshot.as_of, snapshot.close
    );
    let _ = writeln!(
        out,
        "- Tendência diária: {} ({}; inclinações curto={:.4}%, médio={:.4}%, longo={:.4}%)",
        trend_label(t),
        crossover_label(t.crossover),
        t.slope_short * 100.0,
        t.slope_medium * 100.0,
        t.slope_long * 100.0,
    );
    match &snapshot.trend_weekly {
        Some(w) => {
            let _ = writeln!(
                out,
                "- Tendência semanal: {} ({})",
                trend_label(w),
                crossover_label(w.crossover)
            );
        }
        None => {
            let _ = writeln!(out, "- Tendência semanal: histórico insuficiente");
        }
    }

    let supports: Vec<f64> = snapshot
        .levels
        .iter()
        .filter(|l| l.kind == LevelKind::Support)
        .take(3)
        .map(|l| l.price)
        .collect();
    let resistances: Vec<f64> = snapshot
        .levels
        .iter()
        .filter(|l| l.kind == LevelKind::Resistance)
        .take(3)
        .map(|l| l.price)
        .collect();
    let _ = writeln!(out, "- Suportes próximos: {}", prices(&supports));
    let _ = writeln!(out, "- Resistências próximas: {}", prices(&resistances));

    let active = snapshot.breakouts.active();
    if active.is_empty() {
        let _ = writeln!(out, "- Nenhum sinal de rompimento relevante no momento");
    }
    for sig in active {
        let _ = writeln!(
            out,
            "- {} perto de {:.2} (preço {:.2})",
            sig.kind, sig.reference_level, sig.price
        );
    }

    let div = &snapshot.divergence;
    if !div.sufficient_history {
        let _ = writeln!(
            out,
            "- Divergências: histórico insuficiente para a janela de {} barras",
            div.window
        );
    } else if !div.any() {
        let _ = writeln!(out, "- Sem divergências relevantes ({} barras)", div.window);
    }
    for (oscillator, kind) in div.signals.iter().filter_map(|(o, k)| Some((o, (*k)?))) {
        let label = match kind {
            DivergenceKind::Bullish => "altista",
            DivergenceKind::Bearish => "baixista",
        };
        let _ = writeln!(
            out,
            "- Divergência {} em {} ({} barras)",
            label, oscillator, div.window
        );
    }

    let _ = writeln!(
        out,
        "- Volatilidade (ATR): {} ({:.2}% do preço)",
        atr_label(snapshot.atr_class),
        snapshot.normalized_atr * 100.0
    );
    if let Some(ratio) = snapshot.volume_ratio {
        let _ = writeln!(out, "- Volume vs média: {ratio:.2}x");
    }
    if snapshot.near_52w_high {
        let _ = writeln!(out, "- Próximo da máxima de 52 semanas");
    }
    if snapshot.near_52w_low {
        let _ = writeln!(out, "- Próximo da mínima de 52 semanas");
    }
    let setups: Vec<&str> = snapshot
        .setups
        .iter()
        .filter(|s| s.active)
        .map(|s| s.name.as_str())
        .collect();
    if setups.is_empty() {
        let _ = writeln!(out, "- Setups ativos: nenhum");
    } else {
        let _ = writeln!(out, "- Setups ativos: {}", setups.join(", "));
    }

    for (symbol, rho) in &snapshot.correlations {
        match rho {
            Some(r) => {
                let _ = writeln!(out, "- Correlação com {symbol}: {r:.2}");
            }
            None => {
                let _ = writeln!(out, "- Correlação com {symbol}: sem dados suficientes");
            }
        }
    }

    out
}
