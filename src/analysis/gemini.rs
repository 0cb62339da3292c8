//! Gemini-backed analysis collaborator

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Analyst, CallAnalysis, InterviewAnalysis};
use crate::error::{Result, SessionError};
use crate::session::config::CandidateContext;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Settings for the analysis collaborator
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub api_key: String,
    pub model: String,
    /// Override for tests; defaults to the public endpoint
    pub base_url: Option<String>,
}

/// Calls the Gemini `generateContent` API with a response schema
pub struct GeminiAnalyst {
    client: Client,
    settings: AnalysisSettings,
}

impl GeminiAnalyst {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    async fn generate<T: serde::de::DeserializeOwned>(
        &self,
        prompt: String,
        schema: Value,
    ) -> Result<T> {
        let base = self
            .settings
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL);
        let url = format!(
            "{base}/models/{}:generateContent?key={}",
            self.settings.model, self.settings.api_key
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SessionError::AnalysisFailed(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::AnalysisFailed(format!(
                "API error: {status} - {body}"
            )));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| SessionError::AnalysisFailed(format!("unreadable response: {e}")))?;

        let text = result
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(SessionError::AnalysisFailed("empty response".to_string()));
        }

        serde_json::from_str(text)
            .map_err(|e| SessionError::AnalysisFailed(format!("malformed response: {e}")))
    }
}

#[async_trait]
impl Analyst for GeminiAnalyst {
    async fn analyze_call(
        &self,
        transcript: &str,
        _ctx: &CandidateContext,
    ) -> Result<CallAnalysis> {
        let prompt = format!(
            "Based on the following interview scheduling call transcript, provide a detailed analysis.\n\
             \n\
             Transcript:\n---\n{transcript}\n---\n"
        );
        self.generate(prompt, call_schema()).await
    }

    async fn analyze_interview(
        &self,
        transcript: &str,
        ctx: &CandidateContext,
        emotion_summary: &str,
    ) -> Result<InterviewAnalysis> {
        let prompt = format!(
            "You are an expert interview analyst. Analyze the following technical interview for {name}.\n\
             \n\
             Job Description:\n{description}\n\
             \n\
             Resume Highlights:\n{resume}\n\
             \n\
             Interview Transcript:\n{transcript}\n\
             \n\
             Emotion Data During Interview:\n{emotion_summary}\n\
             \n\
             Provide a comprehensive analysis in the specified JSON format.",
            name = ctx.candidate_name,
            description = ctx.job_description,
            resume = ctx
                .resume_highlights
                .as_deref()
                .unwrap_or("No resume analysis available"),
        );
        self.generate(prompt, interview_schema()).await
    }
}

fn call_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "confirmedSlot": {
                "type": "STRING",
                "description": "The specific date and time confirmed by the candidate. If not confirmed, state \"Not Confirmed\"."
            },
            "summary": {
                "type": "STRING",
                "description": "A brief, 2-3 sentence summary of the entire conversation."
            },
            "personalityAnalysis": {
                "type": "STRING",
                "description": "Analysis of the candidate's tone, confidence, and politeness based on their words."
            }
        },
        "required": ["confirmedSlot", "summary", "personalityAnalysis"]
    })
}

fn interview_schema() -> Value {
    let metric = json!({
        "type": "OBJECT",
        "properties": {
            "score": {"type": "INTEGER"},
            "reasoning": {"type": "STRING"}
        },
        "required": ["score", "reasoning"]
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "overallImpression": {"type": "STRING"},
            "confidence": metric.clone(),
            "expressiveness": metric.clone(),
            "knowledge": metric.clone(),
            "communicationSkills": metric,
            "strengths": {"type": "ARRAY", "items": {"type": "STRING"}},
            "areasForImprovement": {"type": "ARRAY", "items": {"type": "STRING"}},
            "emotionAnalysis": {
                "type": "OBJECT",
                "properties": {
                    "summary": {"type": "STRING"},
                    "dominantEmotion": {"type": "STRING"}
                },
                "required": ["summary", "dominantEmotion"]
            }
        },
        "required": [
            "overallImpression", "confidence", "expressiveness", "knowledge",
            "communicationSkills", "strengths", "areasForImprovement", "emotionAnalysis"
        ]
    })
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: Value,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}
