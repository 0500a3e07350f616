//! Keyword Scorer — pillar-level ESG scoring from normalized text, with an
//! optional sentiment adjustment supplied through a pluggable provider.
//!
//! Scoring is pure and deterministic: the same text and keyword tables
//! always produce identical scores. The sentiment provider is a trait so the
//! core stays free of any ML dependency; the default implementation counts
//! polarity keywords.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Score model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub environmental: f64,
    pub social: f64,
    pub governance: f64,
    pub overall: f64,
}

impl ScoreSet {
    fn from_pillars(environmental: f64, social: f64, governance: f64) -> ScoreSet {
        ScoreSet {
            environmental,
            social,
            governance,
            overall: round1((environmental + social + governance) / 3.0),
        }
    }
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

// ────────────────────────────────────────────────────────────────────────────
// Keyword tables
// ────────────────────────────────────────────────────────────────────────────

/// Per-phrase occurrence cap, so repeating one phrase cannot dominate.
const OCCURRENCE_CAP: u32 = 5;

/// Pillar-specific normalization caps: a raw score at the cap maps to 100.
const ENV_TARGET_CAP: f64 = 40.0;
const SOC_TARGET_CAP: f64 = 35.0;
const GOV_TARGET_CAP: f64 = 30.0;

/// (phrase, weight). Domain-critical phrases carry weight 2.0.
type KeywordTable = &'static [(&'static str, f64)];

const ENVIRONMENTAL_KEYWORDS: KeywordTable = &[
    ("net zero", 2.0),
    ("carbon neutral", 2.0),
    ("renewable energy", 2.0),
    ("science-based targets", 2.0),
    ("scope 1", 2.0),
    ("scope 2", 2.0),
    ("scope 3", 2.0),
    ("transition plan", 2.0),
    ("emissions", 1.0),
    ("climate", 1.0),
    ("sustainability", 1.0),
    ("recycling", 1.0),
    ("decarbonization", 1.0),
    ("biodiversity", 1.0),
    ("circular economy", 1.0),
    ("scenario analysis", 1.0),
    ("physical risk", 1.0),
    ("transition risk", 1.0),
    ("water consumption", 1.0),
    ("energy consumption", 1.0),
    ("environment", 0.5),
    ("green", 0.5),
    ("eco", 0.5),
    ("conservation", 0.5),
];

const SOCIAL_KEYWORDS: KeywordTable = &[
    ("human rights", 2.0),
    ("board diversity", 2.0),
    ("diversity equity inclusion", 2.0),
    ("employee wellbeing", 2.0),
    ("collective bargaining", 2.0),
    ("diversity", 1.0),
    ("safety", 1.0),
    ("community", 1.0),
    ("training", 1.0),
    ("due diligence", 1.0),
    ("data protection", 1.0),
    ("stakeholder engagement", 1.0),
    ("supply chain", 1.0),
    ("inclusion", 1.0),
    ("social", 0.5),
    ("employee", 0.5),
    ("workplace", 0.5),
    ("engagement", 0.5),
];

const GOVERNANCE_KEYWORDS: KeywordTable = &[
    ("board independence", 2.0),
    ("executive compensation", 2.0),
    ("audit committee", 2.0),
    ("anti-corruption", 2.0),
    ("whistleblower", 2.0),
    ("board diversity", 2.0),
    ("governance", 1.0),
    ("ethics", 1.0),
    ("compliance", 1.0),
    ("transparency", 1.0),
    ("code of conduct", 1.0),
    ("risk management", 1.0),
    ("board oversight", 1.0),
    ("remuneration policy", 1.0),
    ("board", 0.5),
    ("management", 0.5),
    ("oversight", 0.5),
    ("control", 0.5),
];

// ────────────────────────────────────────────────────────────────────────────
// Normalization & scoring
// ────────────────────────────────────────────────────────────────────────────

/// Lowercase, strip punctuation except `.%-`, collapse whitespace. All
/// downstream keyword matching operates on this form.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for c in text.chars() {
        let keep = c.is_alphanumeric() || matches!(c, '.' | '%' | '-');
        if keep {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

fn count_occurrences(haystack: &str, phrase: &str) -> u32 {
    let mut count = 0u32;
    let mut from = 0usize;
    while let Some(pos) = haystack[from..].find(phrase) {
        count += 1;
        if count >= OCCURRENCE_CAP {
            break;
        }
        from += pos + phrase.len();
        if from >= haystack.len() {
            break;
        }
    }
    count
}

fn pillar_score(normalized: &str, table: KeywordTable, target_cap: f64) -> f64 {
    let raw: f64 = table
        .iter()
        .map(|(phrase, weight)| weight * f64::from(count_occurrences(normalized, phrase)))
        .sum();
    round1((100.0 * raw / target_cap).min(100.0))
}

/// Score already-normalized text across the three pillars.
pub fn score(normalized: &str) -> ScoreSet {
    ScoreSet::from_pillars(
        pillar_score(normalized, ENVIRONMENTAL_KEYWORDS, ENV_TARGET_CAP),
        pillar_score(normalized, SOCIAL_KEYWORDS, SOC_TARGET_CAP),
        pillar_score(normalized, GOVERNANCE_KEYWORDS, GOV_TARGET_CAP),
    )
}

/// Shift every pillar by the sentiment signal (±min(5, 10·confidence)),
/// clamp to [0,100], and recompute the overall score.
pub fn apply_sentiment(scores: ScoreSet, sentiment: &Sentiment) -> ScoreSet {
    let delta = match sentiment.label {
        SentimentLabel::Positive => (10.0 * sentiment.confidence).min(5.0),
        SentimentLabel::Negative => -(10.0 * sentiment.confidence).min(5.0),
        SentimentLabel::Neutral => 0.0,
    };
    let adjust = |v: f64| round1((v + delta).clamp(0.0, 100.0));
    ScoreSet::from_pillars(
        adjust(scores.environmental),
        adjust(scores.social),
        adjust(scores.governance),
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Sentiment provider
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub confidence: f64,
}

/// External sentiment collaborator. Implementations must be cheap to call
/// and are always best-effort: classification failures never fail scoring.
#[async_trait]
pub trait SentimentProvider: Send + Sync {
    async fn classify(&self, text: &str) -> anyhow::Result<Sentiment>;
}

/// Default provider: polarity keyword counting. Deterministic and
/// dependency-free, standing in until a model-backed provider is wired.
pub struct KeywordSentimentProvider;

const POSITIVE_TERMS: &[&str] = &["excellent", "strong", "leading", "innovative", "sustainable"];
const NEGATIVE_TERMS: &[&str] = &["poor", "weak", "lacking", "insufficient", "failed"];

#[async_trait]
impl SentimentProvider for KeywordSentimentProvider {
    async fn classify(&self, text: &str) -> anyhow::Result<Sentiment> {
        let lower = text.to_lowercase();
        let positive = POSITIVE_TERMS
            .iter()
            .filter(|t| lower.contains(**t))
            .count();
        let negative = NEGATIVE_TERMS
            .iter()
            .filter(|t| lower.contains(**t))
            .count();
        let label = match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => SentimentLabel::Positive,
            std::cmp::Ordering::Less => SentimentLabel::Negative,
            std::cmp::Ordering::Equal => SentimentLabel::Neutral,
        };
        Ok(Sentiment {
            label,
            confidence: 0.7,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Keyword extraction
// ────────────────────────────────────────────────────────────────────────────

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "our", "has", "have", "that", "this", "are", "was", "were",
    "will", "from", "their", "they", "its", "into", "over", "been", "but", "not", "all", "can",
    "also", "which", "these", "those", "than", "more", "most", "such", "per", "via", "any",
    "about", "across", "after", "before", "between", "both", "each", "other", "some", "where",
    "while", "year", "years",
];

fn is_stopword(token: &str) -> bool {
    token.len() <= 2 || STOPWORDS.contains(&token) || token.chars().all(|c| !c.is_alphabetic())
}

/// Top recurring unigrams and bigrams by frequency; bigrams are favored.
/// Deterministic tie-break on the phrase itself.
pub fn top_keywords(normalized: &str, limit: usize) -> Vec<String> {
    use std::collections::HashMap;

    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let mut counts: HashMap<String, f64> = HashMap::new();

    for window in tokens.windows(2) {
        if !is_stopword(window[0]) && !is_stopword(window[1]) {
            *counts
                .entry(format!("{} {}", window[0], window[1]))
                .or_default() += 1.5;
        }
    }
    for token in &tokens {
        if !is_stopword(token) && token.len() > 3 {
            *counts.entry((*token).to_string()).or_default() += 1.0;
        }
    }

    let mut ranked: Vec<(String, f64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.into_iter().take(limit).map(|(k, _)| k).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str =
        "We reduced carbon emissions by 35% and increased board diversity to 40% women.";

    #[test]
    fn test_normalize_strips_punctuation_keeps_percent() {
        let n = normalize("Hello, World! 35.5% (net-zero)");
        assert_eq!(n, "hello world 35.5% net-zero");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("a\n\n  b\t c"), "a b c");
    }

    #[test]
    fn test_sample_scores_environmental_and_governance() {
        let scores = score(&normalize(SAMPLE));
        assert!(scores.environmental > 0.0, "{scores:?}");
        assert!(scores.governance > 0.0, "{scores:?}");
        assert!(scores.social > 0.0, "{scores:?}");
    }

    #[test]
    fn test_overall_is_mean_of_pillars() {
        let scores = score(&normalize(SAMPLE));
        let expected = round1(
            (scores.environmental + scores.social + scores.governance) / 3.0,
        );
        assert_eq!(scores.overall, expected);
    }

    #[test]
    fn test_scores_bounded_and_deterministic() {
        let text = normalize(&"net zero scope 1 scope 2 scope 3 renewable energy ".repeat(50));
        let a = score(&text);
        let b = score(&text);
        assert_eq!(a, b);
        assert_eq!(a.environmental, 100.0);
        assert!(a.social <= 100.0 && a.governance <= 100.0);
    }

    #[test]
    fn test_occurrence_cap_limits_stuffing() {
        let stuffed = normalize(&"net zero ".repeat(100));
        let modest = normalize(&"net zero ".repeat(5));
        assert_eq!(score(&stuffed).environmental, score(&modest).environmental);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        let scores = score("");
        assert_eq!(scores.environmental, 0.0);
        assert_eq!(scores.overall, 0.0);
    }

    #[test]
    fn test_sentiment_adjustment_positive() {
        let base = ScoreSet::from_pillars(50.0, 50.0, 50.0);
        let adjusted = apply_sentiment(
            base,
            &Sentiment {
                label: SentimentLabel::Positive,
                confidence: 0.7,
            },
        );
        // min(5, 10*0.7) = 5
        assert_eq!(adjusted.environmental, 55.0);
        assert_eq!(adjusted.overall, 55.0);
    }

    #[test]
    fn test_sentiment_adjustment_negative_clamps_at_zero() {
        let base = ScoreSet::from_pillars(2.0, 50.0, 50.0);
        let adjusted = apply_sentiment(
            base,
            &Sentiment {
                label: SentimentLabel::Negative,
                confidence: 1.0,
            },
        );
        assert_eq!(adjusted.environmental, 0.0);
        assert_eq!(adjusted.social, 45.0);
    }

    #[test]
    fn test_sentiment_neutral_is_identity() {
        let base = score(&normalize(SAMPLE));
        let adjusted = apply_sentiment(
            base,
            &Sentiment {
                label: SentimentLabel::Neutral,
                confidence: 0.9,
            },
        );
        assert_eq!(base, adjusted);
    }

    #[test]
    fn test_sentiment_delta_capped_at_five() {
        let base = ScoreSet::from_pillars(50.0, 50.0, 50.0);
        let low_conf = apply_sentiment(
            base,
            &Sentiment {
                label: SentimentLabel::Positive,
                confidence: 0.3,
            },
        );
        assert_eq!(low_conf.environmental, 53.0);
    }

    #[tokio::test]
    async fn test_keyword_sentiment_provider() {
        let provider = KeywordSentimentProvider;
        let s = provider
            .classify("Our strong and innovative program is leading the sector")
            .await
            .unwrap();
        assert_eq!(s.label, SentimentLabel::Positive);

        let s = provider
            .classify("Disclosure remains poor and insufficient")
            .await
            .unwrap();
        assert_eq!(s.label, SentimentLabel::Negative);

        let s = provider.classify("The report covers 2024").await.unwrap();
        assert_eq!(s.label, SentimentLabel::Neutral);
    }

    #[test]
    fn test_top_keywords_deterministic_and_limited() {
        let n = normalize(
            "Renewable energy investment doubled. Renewable energy capacity grew. \
             Board diversity improved alongside renewable energy output.",
        );
        let a = top_keywords(&n, 10);
        let b = top_keywords(&n, 10);
        assert_eq!(a, b);
        assert!(a.len() <= 10);
        assert!(a.contains(&"renewable energy".to_string()));
    }
}
