//! Keyword-based detection of human-handoff intent.
//!
//! Matching is literal, case-insensitive substring search. There is no
//! stemming or negation handling: "não quero falar com agente" still matches.

use relay_core::types::EscalationScore;

/// Terms that contribute to the soft escalation score.
pub const SCORING_KEYWORDS: &[&str] = &[
    "falar com",
    "agente",
    "humano",
    "atendente",
    "gerente",
    "supervisor",
    "não entendi",
    "não funciona",
    "insatisfeito",
    "frustrado",
    "quero falar",
    "conecte",
    "passe adiante",
    "desisto",
    "problema",
    "erro",
    "bug",
    "falha",
    "falar com agente",
    "falar com humano",
];

/// Explicit requests for a human. Every entry is also a scoring keyword.
pub const EXPLICIT_REQUESTS: &[&str] = &[
    "falar com agente",
    "falar com humano",
    "quero falar",
    "atendente",
    "supervisor",
];

/// Scores inbound messages for escalation. Stateless and deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct EscalationDetector;

impl EscalationDetector {
    pub fn new() -> Self {
        Self
    }

    /// Score `message`.
    ///
    /// `score` is the fraction of [`SCORING_KEYWORDS`] present (each counted
    /// once); `matched` is set when any [`EXPLICIT_REQUESTS`] phrase appears.
    pub fn detect(&self, message: &str) -> EscalationScore {
        let lowered = message.to_lowercase();

        let hits = SCORING_KEYWORDS
            .iter()
            .filter(|kw| lowered.contains(*kw))
            .count();
        let score = hits as f64 / SCORING_KEYWORDS.len() as f64;

        let matched = EXPLICIT_REQUESTS.iter().any(|kw| lowered.contains(kw));

        EscalationScore { matched, score }
    }

    /// Combined decision: explicit request, or a score above `threshold`.
    pub fn should_escalate(result: &EscalationScore, threshold: f64) -> bool {
        result.matched || result.score > threshold
    }
}
