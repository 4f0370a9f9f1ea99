//! Supplementary student profile flags
//!
//! Each rule looks at the predicted class, the DEFA bucket and the raw
//! indicators and may emit one `{perfil, acao}` flag. Rules run independently
//! of each other and of the primary recommendation. A rule whose indicator is
//! missing does not fire.

use crate::models::{StudentMetrics, SupplementaryFlag};

/// Inputs visible to an enrichment rule
pub struct EnrichmentContext<'a> {
    pub predicted_label: &'a str,
    pub status_defa: Option<u8>,
    pub metrics: &'a StudentMetrics,
}

impl EnrichmentContext<'_> {
    fn predicted(&self, label: &str) -> bool {
        self.predicted_label.trim().to_lowercase() == label.to_lowercase()
    }
}

/// A pluggable profile rule
pub trait EnrichmentRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, ctx: &EnrichmentContext<'_>) -> Option<SupplementaryFlag>;
}

fn flag(perfil: &str, acao: &str) -> SupplementaryFlag {
    SupplementaryFlag {
        perfil: perfil.to_string(),
        acao: acao.to_string(),
    }
}

fn below(value: Option<f64>, limit: f64) -> bool {
    value.is_some_and(|v| v < limit)
}

/// Lowest tier predicted for a student already behind grade
pub struct CriticalGapRule;

impl EnrichmentRule for CriticalGapRule {
    fn name(&self) -> &'static str {
        "critical_gap"
    }

    fn evaluate(&self, ctx: &EnrichmentContext<'_>) -> Option<SupplementaryFlag> {
        (ctx.predicted("Quartzo") && ctx.status_defa == Some(0)).then(|| {
            flag(
                "Crítico (Defasagem)",
                "Atenção Prioritária: A defasagem idade-série agrava o risco. Priorizar nivelamento básico.",
            )
        })
    }
}

/// Low engagement together with low psychosocial score
pub struct DisengagedRule;

impl EnrichmentRule for DisengagedRule {
    fn name(&self) -> &'static str {
        "disengaged"
    }

    fn evaluate(&self, ctx: &EnrichmentContext<'_>) -> Option<SupplementaryFlag> {
        (below(ctx.metrics.ieg, 6.0) && below(ctx.metrics.ips, 6.0)).then(|| {
            flag(
                "Desengajado",
                "Apoio Psicossocial: Foco em motivação e participação em atividades de voluntariado para elevar o vínculo.",
            )
        })
    }
}

/// Low learning score while still on track
pub struct AcademicRiskRule;

impl EnrichmentRule for AcademicRiskRule {
    fn name(&self) -> &'static str {
        "academic_risk"
    }

    fn evaluate(&self, ctx: &EnrichmentContext<'_>) -> Option<SupplementaryFlag> {
        (below(ctx.metrics.ida, 6.0) && ctx.status_defa == Some(1)).then(|| {
            flag(
                "Risco Acadêmico",
                "Reforço de Conteúdo: Tutoria acadêmica focada nas matérias de base para evitar que o aluno se atrase.",
            )
        })
    }
}

/// Second tier with a strong turning-point score
pub struct TopTierPotentialRule;

impl EnrichmentRule for TopTierPotentialRule {
    fn name(&self) -> &'static str {
        "top_tier_potential"
    }

    fn evaluate(&self, ctx: &EnrichmentContext<'_>) -> Option<SupplementaryFlag> {
        (ctx.predicted("Ametista") && ctx.metrics.ipv.is_some_and(|v| v > 8.0)).then(|| {
            flag(
                "Potencial Topázio",
                "Mentoria de Excelência: Desafios extras e preparação para competições ou monitoria de outros alunos.",
            )
        })
    }
}

/// The built-in rules in evaluation order
pub fn default_rules() -> Vec<Box<dyn EnrichmentRule>> {
    vec![
        Box::new(CriticalGapRule),
        Box::new(DisengagedRule),
        Box::new(AcademicRiskRule),
        Box::new(TopTierPotentialRule),
    ]
}
