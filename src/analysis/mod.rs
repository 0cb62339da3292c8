//! Post-session analysis collaborator
//!
//! One request per session: the rendered transcript plus context goes out,
//! a structured result matching one of two fixed schemas comes back. An
//! empty or malformed response is a failure, never an empty-but-valid
//! result.

pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::config::CandidateContext;

pub use gemini::{AnalysisSettings, GeminiAnalyst};

/// Structured analysis of a scheduling call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnalysis {
    /// The confirmed interview slot, or "Not Confirmed"
    pub confirmed_slot: String,
    pub summary: String,
    pub personality_analysis: String,
}

/// One scored interview metric with its reasoning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricScore {
    pub score: u8,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionAnalysis {
    pub summary: String,
    pub dominant_emotion: String,
}

/// Structured analysis of a technical interview
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewAnalysis {
    pub overall_impression: String,
    pub confidence: MetricScore,
    pub expressiveness: MetricScore,
    pub knowledge: MetricScore,
    pub communication_skills: MetricScore,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub emotion_analysis: EmotionAnalysis,
}

/// Analysis result for either session kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisResult {
    Call(CallAnalysis),
    Interview(InterviewAnalysis),
}

/// The external analysis collaborator
#[async_trait]
pub trait Analyst: Send + Sync {
    async fn analyze_call(
        &self,
        transcript: &str,
        ctx: &CandidateContext,
    ) -> Result<CallAnalysis>;

    async fn analyze_interview(
        &self,
        transcript: &str,
        ctx: &CandidateContext,
        emotion_summary: &str,
    ) -> Result<InterviewAnalysis>;
}
