// sift-analyzer-rs/src/lib.rs
//
// Content analysis engine
// Provides:
// - The Analyzer trait implemented by every analysis backend
// - GeminiAnalyzer: remote analysis via the Gemini API
// - KeywordAnalyzer: deterministic offline fallback
// - Report types, JSON recovery, and normalization

pub mod extract;
pub mod gemini;
pub mod keyword;
pub mod normalize;
pub mod report;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::{
    GeminiAnalyzer, GeminiConfig, DEFAULT_API_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};
pub use keyword::KeywordAnalyzer;
pub use normalize::normalize;
pub use report::{AnalysisReport, RawReport};

/// Reasons an analysis attempt can fail. Callers decide whether a
/// failure surfaces to the client or degrades to a neutral report.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("analysis request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("analysis service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("analysis service returned an empty response")]
    Empty,

    #[error("no usable JSON in analysis response: {0}")]
    Extraction(String),
}

/// A text analysis backend. Implementations must be safe to share
/// across request handlers.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Short backend identifier, surfaced in stats and health output.
    fn name(&self) -> &str;

    /// Analyze one text and produce a fully-specified report.
    async fn analyze(&self, text: &str) -> Result<AnalysisReport, AnalyzerError>;
}
