// sift-analyzer-rs/src/keyword.rs
//
// Offline keyword analyzer
// Fallback used when no Gemini API key is configured. Scores are
// derived from small word lists and simple text statistics, so the
// same input always produces the same report. Results are rough but
// keep the full report shape and the service usable offline.

use async_trait::async_trait;
use tracing::debug;

use crate::normalize::normalize;
use crate::report::{
    AnalysisReport, RawFlaggedWords, RawProfanity, RawReadability,
    RawReadabilityMetrics, RawReport, RawSensitivity, RawSensitivityCategories,
    RawSentiment, RawToxicity, RawToxicityScores, RawEmotions,
};
use crate::{Analyzer, AnalyzerError};

const TOXIC_WORDS: &[&str] = &[
    "hate", "kill", "die", "stupid", "idiot", "awful", "terrible", "disgusting",
];

const PROFANE_WORDS: &[&str] = &["damn", "hell", "crap", "wtf", "f*ck", "sh!t", "a$$"];

const INSULT_PHRASES: &[&str] = &[
    "loser", "moron", "pathetic", "worthless", "waste of space", "shut up",
];

const THREAT_PHRASES: &[&str] = &["kill you", "hurt you", "destroy you", "watch your back"];

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "happy", "love", "wonderful", "nice", "amazing",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "sad", "angry", "horrible", "terrible", "hate", "worst",
];

/// Keyword-matching analyzer with no external dependencies.
#[derive(Debug, Default)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn build_raw(&self, text: &str) -> RawReport {
        let lower = text.to_lowercase();

        let toxic = matches_in(&lower, TOXIC_WORDS);
        let profane = matches_in(&lower, PROFANE_WORDS);
        let insults = matches_in(&lower, INSULT_PHRASES);
        let threats = matches_in(&lower, THREAT_PHRASES);
        let positives = matches_in(&lower, POSITIVE_WORDS).len() as f64;
        let negatives = matches_in(&lower, NEGATIVE_WORDS).len() as f64;

        let toxicity_score = 0.2 * toxic.len() as f64
            + 0.15 * profane.len() as f64
            + 0.2 * insults.len() as f64
            + 0.25 * threats.len() as f64;
        let profanity_score = 0.4 * profane.len() as f64;
        let sentiment_score = (0.2 * positives - 0.2 * negatives).clamp(-1.0, 1.0);

        let mut flagged: Vec<String> = Vec::new();
        let mut categories = std::collections::BTreeMap::new();
        if !profane.is_empty() {
            categories.insert("profanity".to_string(), profane.clone());
        }
        if !insults.is_empty() {
            categories.insert("insults".to_string(), insults.clone());
        }
        if !toxic.is_empty() || !threats.is_empty() {
            let mut other = toxic.clone();
            other.extend(threats.iter().cloned());
            categories.insert("other".to_string(), other);
        }
        flagged.extend(toxic.iter().cloned());
        flagged.extend(profane.iter().cloned());
        flagged.extend(insults.iter().cloned());
        flagged.extend(threats.iter().cloned());

        let label = if sentiment_score >= 0.2 {
            "POSITIVE"
        } else if sentiment_score <= -0.2 {
            "NEGATIVE"
        } else {
            "NEUTRAL"
        };

        let (avg_word_length, avg_sentence_length, complex_pct) = text_stats(text);

        RawReport {
            toxicity: RawToxicity {
                score: Some(toxicity_score),
                is_toxic: None,
                detailed_scores: RawToxicityScores {
                    toxicity: Some(toxicity_score),
                    severe_toxicity: Some(0.3 * threats.len() as f64),
                    obscene: Some(profanity_score),
                    threat: Some(0.4 * threats.len() as f64),
                    insult: Some(0.3 * insults.len() as f64),
                    identity_hate: Some(0.0),
                },
            },
            sentiment: RawSentiment {
                score: Some(sentiment_score),
                label: Some(label.to_string()),
                emotions: RawEmotions {
                    joy: Some(0.2 * positives),
                    sadness: Some(0.15 * negatives),
                    anger: Some(0.2 * toxic.len() as f64 + 0.3 * threats.len() as f64),
                    fear: Some(0.2 * threats.len() as f64),
                    surprise: Some(0.0),
                },
            },
            profanity: RawProfanity {
                score: Some(profanity_score),
                is_profane: None,
                severity: None,
                categories: Default::default(),
            },
            sensitivity: RawSensitivity {
                score: Some(0.2 * threats.len() as f64),
                is_sensitive: None,
                categories: RawSensitivityCategories {
                    violence: Some(0.4 * threats.len() as f64),
                    ..Default::default()
                },
            },
            readability: RawReadability {
                score: Some(readability_score(avg_word_length, complex_pct)),
                grade_level: Some(avg_sentence_length * 0.4 + avg_word_length * 1.2),
                difficulty: None,
                metrics: RawReadabilityMetrics {
                    avg_word_length: Some(avg_word_length),
                    avg_sentence_length: Some(avg_sentence_length),
                    complex_word_percentage: Some(complex_pct),
                },
            },
            flagged_words: RawFlaggedWords {
                count: Some(flagged.len() as u32),
                words: Some(flagged),
                categories: Some(categories),
                severity_score: None,
                is_severe: None,
            },
        }
    }
}

#[async_trait]
impl Analyzer for KeywordAnalyzer {
    fn name(&self) -> &str {
        "keyword-heuristic"
    }

    async fn analyze(&self, text: &str) -> Result<AnalysisReport, AnalyzerError> {
        debug!(chars = text.len(), "analyzing with keyword heuristics");
        Ok(normalize(self.build_raw(text)))
    }
}

// Single words must match a whole token so "hell" does not fire on
// "hello"; multi-word phrases are matched as substrings. Trailing
// punctuation is ignored but obfuscation characters are kept.
fn matches_in(lower: &str, vocabulary: &[&str]) -> Vec<String> {
    let tokens: Vec<&str> = lower
        .split(|c: char| {
            c.is_whitespace() || matches!(c, ',' | '.' | ';' | ':' | '"' | '(' | ')')
        })
        .filter(|t| !t.is_empty())
        .collect();

    vocabulary
        .iter()
        .copied()
        .filter(|entry| {
            if entry.contains(' ') {
                lower.contains(entry)
            } else {
                tokens
                    .iter()
                    .any(|t| *t == *entry || t.trim_end_matches(['!', '?']) == *entry)
            }
        })
        .map(str::to_string)
        .collect()
}

fn text_stats(text: &str) -> (f64, f64, f64) {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let word_count = words.len() as f64;
    let avg_word_length =
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / word_count;
    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1) as f64;
    let avg_sentence_length = word_count / sentences;
    let complex_pct =
        words.iter().filter(|w| w.chars().count() > 6).count() as f64 / word_count;
    (avg_word_length, avg_sentence_length, complex_pct)
}

fn readability_score(avg_word_length: f64, complex_pct: f64) -> f64 {
    (1.0 - (avg_word_length - 3.0) / 10.0 - complex_pct * 0.3).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::SentimentLabel;

    async fn analyze(text: &str) -> AnalysisReport {
        KeywordAnalyzer::new().analyze(text).await.unwrap()
    }

    #[tokio::test]
    async fn hostile_text_is_flagged_toxic() {
        let report = analyze("I hate you, you're such a waste of space").await;
        assert!(report.toxicity.score > 0.5);
        assert!(report.toxicity.is_toxic);
        assert!(report.flagged_words.count >= 2);
        assert!(report
            .flagged_words
            .words
            .contains(&"waste of space".to_string()));
        assert_eq!(report.sentiment.label, SentimentLabel::Negative);
    }

    #[tokio::test]
    async fn benign_text_stays_clean() {
        let report = analyze("The rain is nice today").await;
        assert!(report.toxicity.score <= 0.1);
        assert!(!report.toxicity.is_toxic);
        assert_eq!(report.flagged_words.count, 0);
        assert_eq!(report.sentiment.label, SentimentLabel::Positive);
    }

    #[tokio::test]
    async fn obfuscated_profanity_is_caught() {
        let report = analyze("what the f*ck is this").await;
        assert!(report.profanity.score > 0.0);
        assert!(report.profanity.is_profane);
        assert!(report.flagged_words.words.contains(&"f*ck".to_string()));
    }

    #[tokio::test]
    async fn same_input_same_report() {
        let text = "You absolute moron, shut up";
        assert_eq!(analyze(text).await, analyze(text).await);
    }

    #[tokio::test]
    async fn empty_text_is_neutral() {
        let report = analyze("").await;
        assert!(!report.toxicity.is_toxic);
        assert_eq!(report.flagged_words.count, 0);
        assert_eq!(report.sentiment.label, SentimentLabel::Neutral);
    }

    #[tokio::test]
    async fn scores_stay_in_range_under_repetition() {
        let report = analyze(
            "hate hate kill die stupid idiot awful terrible disgusting damn hell crap",
        )
        .await;
        assert!(report.toxicity.score <= 1.0);
        assert!(report.profanity.score <= 1.0);
        assert!(report.flagged_words.severity_score <= 1.0);
    }
}
