// sift-analyzer-rs/src/gemini.rs
//
// Gemini-backed analyzer
//
// This module provides:
// - Real HTTP calls to the Gemini generateContent API via reqwest
// - A moderation prompt that requests one strictly-shaped JSON object
// - Response recovery and normalization into an AnalysisReport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::extract_json;
use crate::normalize::normalize;
use crate::report::{AnalysisReport, RawReport};
use crate::{Analyzer, AnalyzerError};

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// The {text} marker is substituted at request time. The schema in the
// prompt matches RawReport field for field; deviations from it are
// handled by extraction and normalization, not by re-prompting.
const PROMPT_TEMPLATE: &str = r#"You are a comprehensive content analysis AI. Analyze the following text for toxicity, sentiment, readability, profanity, and sensitivity. You must detect ALL forms of problematic content, including obfuscated words.

Text to analyze: "{text}"

Return a JSON object with this exact structure:
{
    "toxicity": {
        "score": <0.0-1.0>,
        "is_toxic": <true/false>,
        "detailed_scores": {
            "toxicity": <0.0-1.0>,
            "severe_toxicity": <0.0-1.0>,
            "obscene": <0.0-1.0>,
            "threat": <0.0-1.0>,
            "insult": <0.0-1.0>,
            "identity_hate": <0.0-1.0>
        }
    },
    "sentiment": {
        "score": <-1.0 to 1.0>,
        "label": <"POSITIVE"/"NEGATIVE"/"NEUTRAL">,
        "emotions": {
            "joy": <0.0-1.0>,
            "sadness": <0.0-1.0>,
            "anger": <0.0-1.0>,
            "fear": <0.0-1.0>,
            "surprise": <0.0-1.0>
        }
    },
    "profanity": {
        "score": <0.0-1.0>,
        "is_profane": <true/false>,
        "severity": <"NONE"/"LOW"/"MEDIUM"/"HIGH">,
        "categories": {
            "mild_profanity": <0.0-1.0>,
            "strong_profanity": <0.0-1.0>,
            "sexual_references": <0.0-1.0>,
            "slurs": <0.0-1.0>
        }
    },
    "sensitivity": {
        "score": <0.0-1.0>,
        "is_sensitive": <true/false>,
        "categories": {
            "political": <0.0-1.0>,
            "religious": <0.0-1.0>,
            "racial": <0.0-1.0>,
            "gender": <0.0-1.0>,
            "violence": <0.0-1.0>,
            "self_harm": <0.0-1.0>
        }
    },
    "readability": {
        "score": <0.0-1.0>,
        "grade_level": <1-12>,
        "difficulty": <"EASY"/"MEDIUM"/"DIFFICULT">,
        "metrics": {
            "avg_word_length": <number>,
            "avg_sentence_length": <number>,
            "complex_word_percentage": <0.0-1.0>
        }
    },
    "flagged_words": {
        "count": <number>,
        "words": [<word1>, <word2>, ...],
        "categories": {
            "profanity": [<words>],
            "insults": [<words>],
            "slurs": [<words>],
            "other": [<words>]
        },
        "severity_score": <0.0-1.0>,
        "is_severe": <true/false>
    }
}

Important rules:
1. Detect ALL profanity including obfuscated forms (f*ck, sh!t, a$$, etc.)
2. Score toxicity high for profanity and aggressive language
3. Consider ALL-CAPS and multiple punctuation (!!!) as anger indicators
4. Include original obfuscated forms in flagged_words
5. Set high severity for multiple profanities or aggressive context
6. Carefully analyze for sensitive topics like politics, religion, race
7. Evaluate readability using standard metrics (word/sentence length, complexity)
8. For sentiment, identify underlying emotions beyond positive/negative

Return ONLY valid JSON, no other text or explanation."#;

/// Connection settings for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

// Moderation input is exactly what safety filters would block, so
// blocking is disabled and the analysis itself does the judging.
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Analyzer backed by the Gemini generateContent API.
pub struct GeminiAnalyzer {
    http: Client,
    config: GeminiConfig,
}

impl GeminiAnalyzer {
    pub fn new(config: GeminiConfig) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn request_body(&self, text: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: PROMPT_TEMPLATE.replace("{text}", text),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                top_p: 1.0,
                top_k: 1,
                max_output_tokens: 2048,
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }

    async fn generate(&self, text: &str) -> Result<String, AnalyzerError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&self.request_body(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateContentResponse = response.json().await?;
        let text: String = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AnalyzerError::Empty);
        }
        Ok(text)
    }
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn analyze(&self, text: &str) -> Result<AnalysisReport, AnalyzerError> {
        debug!(chars = text.len(), "requesting content analysis");
        let response_text = self.generate(text).await?;
        let value = extract_json(&response_text)?;
        let raw: RawReport = serde_json::from_value(value)
            .map_err(|err| AnalyzerError::Extraction(err.to_string()))?;
        Ok(normalize(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_model() {
        let analyzer = GeminiAnalyzer::new(GeminiConfig::new("k"));
        assert_eq!(
            analyzer.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );

        let mut config = GeminiConfig::new("k");
        config.api_url = "http://localhost:9999/v1beta/".into();
        config.model = "test-model".into();
        let analyzer = GeminiAnalyzer::new(config);
        assert_eq!(
            analyzer.endpoint(),
            "http://localhost:9999/v1beta/models/test-model:generateContent"
        );
    }

    #[test]
    fn request_body_embeds_text_and_settings() {
        let analyzer = GeminiAnalyzer::new(GeminiConfig::new("k"));
        let body = serde_json::to_value(analyzer.request_body("sample input")).unwrap();

        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Text to analyze: \"sample input\""));
        assert!(prompt.contains("Return ONLY valid JSON"));
        assert!(!prompt.contains("{text}"));

        assert_eq!(body["generationConfig"]["temperature"], 0.0);
        assert_eq!(body["generationConfig"]["topK"], 1);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);

        let settings = body["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        for setting in settings {
            assert_eq!(setting["threshold"], "BLOCK_NONE");
        }
    }

    #[test]
    fn analyzer_reports_model_name() {
        let analyzer = GeminiAnalyzer::new(GeminiConfig::new("k"));
        assert_eq!(analyzer.name(), "gemini-2.0-flash");
    }
}
