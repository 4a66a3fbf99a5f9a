// sift-analyzer-rs/src/normalize.rs
//
// Report normalization
// Turns tolerant raw model output into a fully-specified report:
// - missing sections and fields get defaults
// - numeric scores are clamped to their valid ranges
// - boolean flags are made consistent with the scores
// - flagged words repair an implausibly low toxicity score

use crate::report::{
    AnalysisReport, Difficulty, FlaggedWordsSection, ProfanityCategories,
    ProfanitySection, ProfanitySeverity, RawReport, ReadabilityMetrics,
    ReadabilitySection, SensitivityCategories, SensitivitySection,
    SentimentLabel, SentimentSection, ToxicityScores, ToxicitySection,
};

/// Toxicity forced at least this high when flagged words are present.
const FLAGGED_TOXICITY_FLOOR: f64 = 0.7;

pub fn normalize(raw: RawReport) -> AnalysisReport {
    let mut toxicity = normalize_toxicity(raw.toxicity);
    let sentiment = normalize_sentiment(raw.sentiment);
    let profanity = normalize_profanity(raw.profanity);
    let sensitivity = normalize_sensitivity(raw.sensitivity);
    let readability = normalize_readability(raw.readability);
    let flagged_words = normalize_flagged(raw.flagged_words, &profanity, &toxicity);

    // A model that lists flagged words but reports low toxicity is
    // contradicting itself; trust the word list.
    if flagged_words.count > 0 {
        toxicity.score = toxicity
            .score
            .max(FLAGGED_TOXICITY_FLOOR)
            .max(flagged_words.severity_score);
        toxicity.is_toxic = true;
    }

    AnalysisReport {
        toxicity,
        sentiment,
        profanity,
        sensitivity,
        readability,
        flagged_words,
    }
}

fn normalize_toxicity(raw: crate::report::RawToxicity) -> ToxicitySection {
    let score = unit(raw.score);
    let detailed_scores = ToxicityScores {
        toxicity: unit(raw.detailed_scores.toxicity),
        severe_toxicity: unit(raw.detailed_scores.severe_toxicity),
        obscene: unit(raw.detailed_scores.obscene),
        threat: unit(raw.detailed_scores.threat),
        insult: unit(raw.detailed_scores.insult),
        identity_hate: unit(raw.detailed_scores.identity_hate),
    };
    let any_detailed_high = [
        detailed_scores.toxicity,
        detailed_scores.severe_toxicity,
        detailed_scores.obscene,
        detailed_scores.threat,
        detailed_scores.insult,
        detailed_scores.identity_hate,
    ]
    .iter()
    .any(|s| *s > 0.5);

    ToxicitySection {
        score,
        is_toxic: raw.is_toxic.unwrap_or(false) || score > 0.5 || any_detailed_high,
        detailed_scores,
    }
}

fn normalize_sentiment(raw: crate::report::RawSentiment) -> SentimentSection {
    SentimentSection {
        score: signed_unit(raw.score),
        label: parse_label(raw.label.as_deref()),
        emotions: crate::report::EmotionScores {
            joy: unit(raw.emotions.joy),
            sadness: unit(raw.emotions.sadness),
            anger: unit(raw.emotions.anger),
            fear: unit(raw.emotions.fear),
            surprise: unit(raw.emotions.surprise),
        },
    }
}

fn normalize_profanity(raw: crate::report::RawProfanity) -> ProfanitySection {
    let score = unit(raw.score);
    let mut is_profane = raw.is_profane.unwrap_or(false);
    let mut severity = parse_severity(raw.severity.as_deref());

    // Severity is recomputed from the score only once the score is
    // meaningful; below the threshold the reported bucket stands.
    if score > 0.3 {
        is_profane = true;
        severity = if score > 0.7 {
            ProfanitySeverity::High
        } else if score > 0.4 {
            ProfanitySeverity::Medium
        } else {
            ProfanitySeverity::Low
        };
    }

    ProfanitySection {
        score,
        is_profane,
        severity,
        categories: ProfanityCategories {
            mild_profanity: unit(raw.categories.mild_profanity),
            strong_profanity: unit(raw.categories.strong_profanity),
            sexual_references: unit(raw.categories.sexual_references),
            slurs: unit(raw.categories.slurs),
        },
    }
}

fn normalize_sensitivity(raw: crate::report::RawSensitivity) -> SensitivitySection {
    let score = unit(raw.score);
    let categories = SensitivityCategories {
        political: unit(raw.categories.political),
        religious: unit(raw.categories.religious),
        racial: unit(raw.categories.racial),
        gender: unit(raw.categories.gender),
        violence: unit(raw.categories.violence),
        self_harm: unit(raw.categories.self_harm),
    };
    let any_category_high = [
        categories.political,
        categories.religious,
        categories.racial,
        categories.gender,
        categories.violence,
        categories.self_harm,
    ]
    .iter()
    .any(|s| *s > 0.6);

    SensitivitySection {
        score,
        is_sensitive: raw.is_sensitive.unwrap_or(false) || score > 0.5 || any_category_high,
        categories,
    }
}

fn normalize_readability(raw: crate::report::RawReadability) -> ReadabilitySection {
    let defaults = ReadabilityMetrics::default();
    ReadabilitySection {
        score: unit_or(raw.score, 0.5),
        grade_level: grade_level(raw.grade_level),
        difficulty: parse_difficulty(raw.difficulty.as_deref()),
        metrics: ReadabilityMetrics {
            avg_word_length: length_or(raw.metrics.avg_word_length, defaults.avg_word_length),
            avg_sentence_length: length_or(
                raw.metrics.avg_sentence_length,
                defaults.avg_sentence_length,
            ),
            complex_word_percentage: unit_or(
                raw.metrics.complex_word_percentage,
                defaults.complex_word_percentage,
            ),
        },
    }
}

fn normalize_flagged(
    raw: crate::report::RawFlaggedWords,
    profanity: &ProfanitySection,
    toxicity: &ToxicitySection,
) -> FlaggedWordsSection {
    let count = raw.count.unwrap_or(0);
    let mut severity_score = unit(raw.severity_score);
    let mut is_severe = raw.is_severe.unwrap_or(false);

    if count > 0 {
        if severity_score == 0.0 {
            severity_score = profanity.score.max(toxicity.score);
        }
        is_severe = severity_score > 0.5;
    }

    FlaggedWordsSection {
        count,
        words: raw.words.unwrap_or_default(),
        categories: raw.categories.unwrap_or_default(),
        severity_score,
        is_severe,
    }
}

// Clamp helpers. Non-finite values are treated as absent so NaN can
// never leak into a report.

fn unit(value: Option<f64>) -> f64 {
    unit_or(value, 0.0)
}

fn unit_or(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => default,
    }
}

fn signed_unit(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(-1.0, 1.0),
        _ => 0.0,
    }
}

fn length_or(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => default,
    }
}

fn grade_level(value: Option<f64>) -> u8 {
    match value {
        Some(v) if v.is_finite() => v.clamp(1.0, 12.0).round() as u8,
        _ => 8,
    }
}

fn parse_label(raw: Option<&str>) -> SentimentLabel {
    match raw.map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("POSITIVE") => SentimentLabel::Positive,
        Some(s) if s.eq_ignore_ascii_case("NEGATIVE") => SentimentLabel::Negative,
        _ => SentimentLabel::Neutral,
    }
}

fn parse_severity(raw: Option<&str>) -> ProfanitySeverity {
    match raw.map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("LOW") => ProfanitySeverity::Low,
        Some(s) if s.eq_ignore_ascii_case("MEDIUM") => ProfanitySeverity::Medium,
        Some(s) if s.eq_ignore_ascii_case("HIGH") => ProfanitySeverity::High,
        _ => ProfanitySeverity::None,
    }
}

fn parse_difficulty(raw: Option<&str>) -> Difficulty {
    match raw.map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("EASY") => Difficulty::Easy,
        Some(s) if s.eq_ignore_ascii_case("DIFFICULT") => Difficulty::Difficult,
        _ => Difficulty::Medium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{RawFlaggedWords, RawProfanity, RawSentiment, RawToxicity};

    fn raw_from(json: &str) -> RawReport {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_payload_normalizes_to_neutral() {
        let report = normalize(RawReport::default());
        assert_eq!(report, AnalysisReport::neutral());
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let raw = raw_from(
            r#"{
                "toxicity": {"score": 1.7, "detailed_scores": {"insult": -0.4}},
                "sentiment": {"score": 2.5},
                "profanity": {"score": -1.0},
                "readability": {"score": 9.0}
            }"#,
        );
        let report = normalize(raw);
        assert_eq!(report.toxicity.score, 1.0);
        assert_eq!(report.toxicity.detailed_scores.insult, 0.0);
        assert_eq!(report.sentiment.score, 1.0);
        assert_eq!(report.profanity.score, 0.0);
        assert_eq!(report.readability.score, 1.0);
    }

    #[test]
    fn non_finite_scores_fall_back_to_defaults() {
        let raw = RawReport {
            toxicity: RawToxicity {
                score: Some(f64::NAN),
                ..Default::default()
            },
            sentiment: RawSentiment {
                score: Some(f64::INFINITY),
                ..Default::default()
            },
            ..Default::default()
        };
        let report = normalize(raw);
        assert_eq!(report.toxicity.score, 0.0);
        assert_eq!(report.sentiment.score, 0.0);
    }

    #[test]
    fn detailed_score_marks_text_toxic() {
        let raw = raw_from(
            r#"{"toxicity": {"score": 0.2, "detailed_scores": {"threat": 0.9}}}"#,
        );
        let report = normalize(raw);
        assert!(report.toxicity.is_toxic);
        assert_eq!(report.toxicity.score, 0.2);
    }

    #[test]
    fn profanity_severity_recomputed_above_threshold() {
        for (score, expected) in [
            (0.2, ProfanitySeverity::None),
            (0.35, ProfanitySeverity::Low),
            (0.5, ProfanitySeverity::Medium),
            (0.8, ProfanitySeverity::High),
        ] {
            let raw = raw_from(&format!(r#"{{"profanity": {{"score": {score}}}}}"#));
            let report = normalize(raw);
            assert_eq!(report.profanity.severity, expected, "score {score}");
            assert_eq!(report.profanity.is_profane, score > 0.3, "score {score}");
        }
    }

    #[test]
    fn reported_severity_stands_below_threshold() {
        let raw = RawReport {
            profanity: RawProfanity {
                score: Some(0.1),
                severity: Some("HIGH".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let report = normalize(raw);
        assert_eq!(report.profanity.severity, ProfanitySeverity::High);
        assert!(!report.profanity.is_profane);
    }

    #[test]
    fn sensitive_category_marks_text_sensitive() {
        let raw = raw_from(
            r#"{"sensitivity": {"score": 0.1, "categories": {"violence": 0.65}}}"#,
        );
        assert!(normalize(raw).sensitivity.is_sensitive);
    }

    #[test]
    fn grade_level_rounded_and_clamped() {
        for (raw_level, expected) in [(14.6, 12), (0.2, 1), (7.4, 7)] {
            let raw = raw_from(&format!(
                r#"{{"readability": {{"grade_level": {raw_level}}}}}"#
            ));
            assert_eq!(normalize(raw).readability.grade_level, expected);
        }
    }

    #[test]
    fn unknown_labels_fall_back_to_defaults() {
        let raw = raw_from(
            r#"{
                "sentiment": {"label": "ECSTATIC"},
                "profanity": {"severity": "EXTREME"},
                "readability": {"difficulty": "IMPOSSIBLE"}
            }"#,
        );
        let report = normalize(raw);
        assert_eq!(report.sentiment.label, SentimentLabel::Neutral);
        assert_eq!(report.profanity.severity, ProfanitySeverity::None);
        assert_eq!(report.readability.difficulty, Difficulty::Medium);
    }

    #[test]
    fn missing_severity_derived_from_scores() {
        let raw = raw_from(
            r#"{
                "toxicity": {"score": 0.4},
                "profanity": {"score": 0.6},
                "flagged_words": {"count": 2, "words": ["a", "b"]}
            }"#,
        );
        let report = normalize(raw);
        assert_eq!(report.flagged_words.severity_score, 0.6);
        assert!(report.flagged_words.is_severe);
    }

    #[test]
    fn flagged_words_repair_low_toxicity() {
        let raw = RawReport {
            flagged_words: RawFlaggedWords {
                count: Some(3),
                words: Some(vec!["bad".into()]),
                ..Default::default()
            },
            ..Default::default()
        };
        let report = normalize(raw);
        assert!(report.toxicity.score >= 0.7);
        assert!(report.toxicity.is_toxic);
    }

    #[test]
    fn repair_keeps_higher_existing_score() {
        let raw = raw_from(
            r#"{
                "toxicity": {"score": 0.95},
                "flagged_words": {"count": 1, "severity_score": 0.8}
            }"#,
        );
        let report = normalize(raw);
        assert_eq!(report.toxicity.score, 0.95);
    }

    #[test]
    fn repair_uses_severity_when_higher_than_floor() {
        let raw = raw_from(
            r#"{"flagged_words": {"count": 1, "severity_score": 0.9}}"#,
        );
        let report = normalize(raw);
        assert_eq!(report.toxicity.score, 0.9);
        assert!(report.flagged_words.is_severe);
    }

    #[test]
    fn zero_flagged_words_leave_toxicity_alone() {
        let raw = raw_from(r#"{"toxicity": {"score": 0.1}}"#);
        let report = normalize(raw);
        assert_eq!(report.toxicity.score, 0.1);
        assert!(!report.toxicity.is_toxic);
    }
}
