// sift-analyzer-rs/src/report.rs
//
// Analysis report data model
// Provides:
// - The fully-specified report returned for every analyzed text
// - A tolerant raw mirror for JSON produced by the remote model
// - The neutral report served when analysis is unavailable

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Overall sentiment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    #[default]
    Neutral,
}

/// Profanity severity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProfanitySeverity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

/// Reading difficulty bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Difficult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ToxicityScores {
    pub toxicity: f64,
    pub severe_toxicity: f64,
    pub obscene: f64,
    pub threat: f64,
    pub insult: f64,
    pub identity_hate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ToxicitySection {
    pub score: f64,
    pub is_toxic: bool,
    pub detailed_scores: ToxicityScores,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EmotionScores {
    pub joy: f64,
    pub sadness: f64,
    pub anger: f64,
    pub fear: f64,
    pub surprise: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SentimentSection {
    /// Polarity in [-1.0, 1.0].
    pub score: f64,
    pub label: SentimentLabel,
    pub emotions: EmotionScores,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProfanityCategories {
    pub mild_profanity: f64,
    pub strong_profanity: f64,
    pub sexual_references: f64,
    pub slurs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProfanitySection {
    pub score: f64,
    pub is_profane: bool,
    pub severity: ProfanitySeverity,
    pub categories: ProfanityCategories,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SensitivityCategories {
    pub political: f64,
    pub religious: f64,
    pub racial: f64,
    pub gender: f64,
    pub violence: f64,
    pub self_harm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SensitivitySection {
    pub score: f64,
    pub is_sensitive: bool,
    pub categories: SensitivityCategories,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadabilityMetrics {
    pub avg_word_length: f64,
    pub avg_sentence_length: f64,
    pub complex_word_percentage: f64,
}

impl Default for ReadabilityMetrics {
    fn default() -> Self {
        Self {
            avg_word_length: 5.0,
            avg_sentence_length: 15.0,
            complex_word_percentage: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadabilitySection {
    pub score: f64,
    pub grade_level: u8,
    pub difficulty: Difficulty,
    pub metrics: ReadabilityMetrics,
}

impl Default for ReadabilitySection {
    fn default() -> Self {
        Self {
            score: 0.5,
            grade_level: 8,
            difficulty: Difficulty::Medium,
            metrics: ReadabilityMetrics::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FlaggedWordsSection {
    pub count: u32,
    pub words: Vec<String>,
    pub categories: BTreeMap<String, Vec<String>>,
    pub severity_score: f64,
    pub is_severe: bool,
}

/// The complete analysis report. Every field is always present so
/// consumers never have to null-check individual sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisReport {
    pub toxicity: ToxicitySection,
    pub sentiment: SentimentSection,
    pub profanity: ProfanitySection,
    pub sensitivity: SensitivitySection,
    pub readability: ReadabilitySection,
    pub flagged_words: FlaggedWordsSection,
}

impl AnalysisReport {
    /// Neutral report: zero scores, empty flagged words, average readability.
    /// Served whenever analysis fails so the API degrades instead of erroring.
    pub fn neutral() -> Self {
        Self::default()
    }
}

// Tolerant mirror of the report shape. Every field is optional so that
// partial or sloppy model output still deserializes; normalization fills
// the gaps with defaults. Fields of the wrong type fail the parse, which
// callers treat the same as unusable output.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReport {
    #[serde(default)]
    pub toxicity: RawToxicity,
    #[serde(default)]
    pub sentiment: RawSentiment,
    #[serde(default)]
    pub profanity: RawProfanity,
    #[serde(default)]
    pub sensitivity: RawSensitivity,
    #[serde(default)]
    pub readability: RawReadability,
    #[serde(default)]
    pub flagged_words: RawFlaggedWords,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawToxicity {
    pub score: Option<f64>,
    pub is_toxic: Option<bool>,
    #[serde(default)]
    pub detailed_scores: RawToxicityScores,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawToxicityScores {
    pub toxicity: Option<f64>,
    pub severe_toxicity: Option<f64>,
    pub obscene: Option<f64>,
    pub threat: Option<f64>,
    pub insult: Option<f64>,
    pub identity_hate: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSentiment {
    pub score: Option<f64>,
    pub label: Option<String>,
    #[serde(default)]
    pub emotions: RawEmotions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEmotions {
    pub joy: Option<f64>,
    pub sadness: Option<f64>,
    pub anger: Option<f64>,
    pub fear: Option<f64>,
    pub surprise: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProfanity {
    pub score: Option<f64>,
    pub is_profane: Option<bool>,
    pub severity: Option<String>,
    #[serde(default)]
    pub categories: RawProfanityCategories,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProfanityCategories {
    pub mild_profanity: Option<f64>,
    pub strong_profanity: Option<f64>,
    pub sexual_references: Option<f64>,
    pub slurs: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSensitivity {
    pub score: Option<f64>,
    pub is_sensitive: Option<bool>,
    #[serde(default)]
    pub categories: RawSensitivityCategories,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSensitivityCategories {
    pub political: Option<f64>,
    pub religious: Option<f64>,
    pub racial: Option<f64>,
    pub gender: Option<f64>,
    pub violence: Option<f64>,
    pub self_harm: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReadability {
    pub score: Option<f64>,
    pub grade_level: Option<f64>,
    pub difficulty: Option<String>,
    #[serde(default)]
    pub metrics: RawReadabilityMetrics,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReadabilityMetrics {
    pub avg_word_length: Option<f64>,
    pub avg_sentence_length: Option<f64>,
    pub complex_word_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFlaggedWords {
    pub count: Option<u32>,
    pub words: Option<Vec<String>>,
    pub categories: Option<BTreeMap<String, Vec<String>>>,
    pub severity_score: Option<f64>,
    pub is_severe: Option<bool>,
}
