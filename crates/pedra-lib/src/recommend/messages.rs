//! Recommendation thresholds and message templates
//!
//! Templates may use `{defa}` (the rounded DEFA) and `{nome}` (the student
//! name or its default).

use crate::models::SuggestedMessages;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LARGE_DEFA_THRESHOLD: i64 = 2;
pub const DEFAULT_REVIEW_RISK_THRESHOLD: f64 = 0.75;
pub const DEFAULT_STUDENT_NAME: &str = "O aluno";

/// Tunables of the recommendation rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// |DEFA| at or above which a gap counts as large
    pub large_defa_threshold: i64,
    /// Risk at or above which an ahead-of-grade student is flagged for review
    pub review_risk_threshold: f64,
    /// Whether the supplementary profile rules run
    pub enrichment_enabled: bool,
    /// Name used in messages when the request carries none
    pub default_student_name: String,
    pub messages: MessageCatalog,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            large_defa_threshold: DEFAULT_LARGE_DEFA_THRESHOLD,
            review_risk_threshold: DEFAULT_REVIEW_RISK_THRESHOLD,
            enrichment_enabled: true,
            default_student_name: DEFAULT_STUDENT_NAME.to_string(),
            messages: MessageCatalog::default(),
        }
    }
}

/// Family and professor texts for every branch of the rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageCatalog {
    pub severe_gap: SuggestedMessages,
    pub gap: SuggestedMessages,
    pub far_ahead: SuggestedMessages,
    pub ahead: SuggestedMessages,
    /// Appended to both texts when an ahead student scores high risk
    pub review_note: SuggestedMessages,
    pub critical_risk: SuggestedMessages,
    pub high_risk: SuggestedMessages,
    pub top_tier: SuggestedMessages,
    pub routine: SuggestedMessages,
    pub model_unavailable: SuggestedMessages,
}

fn pair(family: &str, professor: &str) -> SuggestedMessages {
    SuggestedMessages {
        family: family.to_string(),
        professor: professor.to_string(),
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            severe_gap: pair(
                "Detectamos defasagem grave (DEFA={defa}). Requer reunião imediata com coordenação.",
                "Acionar plano de intervenção intensiva, tutorias diárias, contato família.",
            ),
            gap: pair(
                "Detectamos defasagem (DEFA={defa}). Recomendamos plano de recuperação de curto prazo.",
                "Atividades focalizadas e monitoramento.",
            ),
            far_ahead: pair(
                "{nome} está adiantado (DEFA={defa}). Sugerimos aprofundamento/possível aceleração.",
                "Projetos de aprofundamento, mentorias, avaliar aceleração.",
            ),
            ahead: pair(
                "{nome} está ligeiramente adiantado (DEFA={defa}). Sugerimos atividades de extensão.",
                "Desafios adicionais e monitorar engajamento.",
            ),
            review_note: pair(
                " (Nota: modelo indica risco; revisar caso.)",
                " (Rever indicador de risco.)",
            ),
            critical_risk: pair(
                "Detectamos risco crítico. Agendar apoio psicopedagógico urgente.",
                "Priorizar acompanhamento intensivo e comunicação com a família.",
            ),
            high_risk: pair(
                "Sinais de risco. Recomendamos tutoria 1-2x/semana por 4 semanas.",
                "Planejar recuperação focalizada e monitorar semanalmente.",
            ),
            top_tier: pair(
                "Bom desempenho — sugerimos atividades de aprofundamento.",
                "Oferecer desafios e extensão.",
            ),
            routine: pair(
                "Acompanhamento de rotina; entraremos em contato se houver piora.",
                "Monitorar evolução e aplicar micro-intervenção se necessário.",
            ),
            model_unavailable: pair(
                "Sem modelo disponível: faremos revisão por DEFA e acompanhamento de rotina.",
                "Monitorar presença e desempenho; reportar casos de atenção.",
            ),
        }
    }
}

/// Fill `{defa}` and `{nome}` in both texts
pub fn render(template: &SuggestedMessages, defa: i64, nome: &str) -> SuggestedMessages {
    let fill = |text: &str| {
        text.replace("{defa}", &defa.to_string())
            .replace("{nome}", nome)
    };
    SuggestedMessages {
        family: fill(&template.family),
        professor: fill(&template.professor),
    }
}
