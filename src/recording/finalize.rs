//! Post-session finalization
//!
//! Runs once per session, after capture has been halted: wait for the
//! recorder to flush, assemble the artifact, upload it, request analysis,
//! persist the results, and advance the candidate's status. Every step
//! failure is recorded and the pipeline keeps going — the caller always
//! receives an outcome, degraded or not. The 60-second ceiling is enforced
//! by the state machine wrapping this future in a timeout.

use std::sync::Arc;

use serde_json::json;
use tracing::{error, info};

use super::recorder::{RecorderHandle, RecordingArtifact};
use crate::analysis::{Analyst, AnalysisResult};
use crate::session::config::{CandidateContext, SessionKind};
use crate::session::state::SessionOutcome;
use crate::store::{RecruitStore, STATUS_CALL_COMPLETED, STATUS_INTERVIEW_COMPLETED};
use crate::transcript::Transcript;

/// Everything finalization needs from the terminated session
pub struct FinalizeRequest {
    pub session_id: String,
    pub kind: SessionKind,
    pub candidate: CandidateContext,
    /// Snapshot with every entry already marked final
    pub transcript: Transcript,
    /// Present for interview sessions
    pub emotion_summary: Option<String>,
    /// Transport failure that triggered termination, if any
    pub termination_error: Option<String>,
}

pub async fn run(
    req: FinalizeRequest,
    recorder: RecorderHandle,
    store: Arc<dyn RecruitStore>,
    analyst: Arc<dyn Analyst>,
) -> SessionOutcome {
    let mut outcome = SessionOutcome::new(&req.session_id, req.kind);
    if let Some(reason) = &req.termination_error {
        outcome.errors.push(reason.clone());
    }

    // wait for the recorder's flush before touching the media
    let artifact = match recorder.finish().await {
        Ok(artifact) => {
            outcome.duration_secs = artifact.duration_secs;
            Some(artifact)
        }
        Err(e) => {
            error!("recorder flush failed: {e}");
            outcome.errors.push(e.to_string());
            None
        }
    };

    if let Some(artifact) = &artifact {
        match upload(&req, artifact, store.as_ref()).await {
            Ok(url) => outcome.artifact_url = Some(url),
            Err(e) => {
                error!("artifact upload failed: {e}");
                outcome.errors.push(e.to_string());
            }
        }
    }

    match req.kind {
        SessionKind::Call => finalize_call(&req, artifact.as_ref(), &mut outcome, &store, &analyst).await,
        SessionKind::Interview => {
            finalize_interview(&req, artifact.as_ref(), &mut outcome, &store, &analyst).await;
        }
    }

    info!(
        session_id = %req.session_id,
        degraded = outcome.is_degraded(),
        "finalization complete"
    );
    outcome
}

async fn upload(
    req: &FinalizeRequest,
    artifact: &RecordingArtifact,
    store: &dyn RecruitStore,
) -> crate::error::Result<String> {
    let (bucket, extension) = match req.kind {
        SessionKind::Call => ("call-recordings", "wav"),
        SessionKind::Interview => {
            if artifact.content_type == super::recorder::VIDEO_CONTENT_TYPE {
                ("interview-recordings", "webm")
            } else {
                ("interview-recordings", "wav")
            }
        }
    };
    let path = format!(
        "{}/{}.{extension}",
        req.candidate.candidate_id, req.session_id
    );
    store
        .upload_artifact(
            artifact.media.clone(),
            artifact.content_type,
            bucket,
            &path,
        )
        .await
}

async fn finalize_call(
    req: &FinalizeRequest,
    artifact: Option<&RecordingArtifact>,
    outcome: &mut SessionOutcome,
    store: &Arc<dyn RecruitStore>,
    analyst: &Arc<dyn Analyst>,
) {
    let rendered = req.transcript.render_final();
    if rendered.is_empty() {
        outcome.errors.push("empty transcript, analysis skipped".to_string());
        return;
    }

    let analysis = match analyst.analyze_call(&rendered, &req.candidate).await {
        Ok(analysis) => analysis,
        Err(e) => {
            error!("call analysis failed: {e}");
            outcome.errors.push(e.to_string());
            return;
        }
    };

    let fields = json!({
        "candidate_id": req.candidate.candidate_id,
        "call_audio_url": outcome.artifact_url.clone(),
        "call_duration_seconds": outcome.duration_secs,
        "confirmed_slot": analysis.confirmed_slot.clone(),
        "call_summary": analysis.summary.clone(),
        "personality_analysis": analysis.personality_analysis.clone(),
        "transcript": req.transcript.entries(),
        "call_started_at": artifact.map(|a| a.started_at.to_rfc3339()),
        "call_ended_at": artifact.map(|a| a.ended_at.to_rfc3339()),
    });
    if let Err(e) = store.create_record("call_sessions", fields).await {
        error!("failed to persist call session: {e}");
        outcome.errors.push(e.to_string());
    } else if let Err(e) = store
        .update_status(&req.candidate.candidate_id, STATUS_CALL_COMPLETED)
        .await
    {
        error!("failed to update candidate status: {e}");
        outcome.errors.push(e.to_string());
    }

    outcome.analysis = Some(AnalysisResult::Call(analysis));
}

async fn finalize_interview(
    req: &FinalizeRequest,
    artifact: Option<&RecordingArtifact>,
    outcome: &mut SessionOutcome,
    store: &Arc<dyn RecruitStore>,
    analyst: &Arc<dyn Analyst>,
) {
    let emotion_summary = req
        .emotion_summary
        .clone()
        .unwrap_or_else(|| crate::emotion::NO_DATA_SUMMARY.to_string());

    // the interview record is persisted before analysis so the recording
    // survives an analysis failure
    let fields = json!({
        "candidate_id": req.candidate.candidate_id,
        "video_url": outcome.artifact_url.clone(),
        "video_duration_seconds": outcome.duration_secs,
        "transcript": req.transcript.entries(),
        "emotion_data": emotion_summary.clone(),
        "interview_started_at": artifact.map(|a| a.started_at.to_rfc3339()),
        "interview_ended_at": artifact.map(|a| a.ended_at.to_rfc3339()),
    });
    let interview_id = match store.create_record("video_interviews", fields).await {
        Ok(record) => {
            if let Err(e) = store
                .update_status(&req.candidate.candidate_id, STATUS_INTERVIEW_COMPLETED)
                .await
            {
                error!("failed to update candidate status: {e}");
                outcome.errors.push(e.to_string());
            }
            record.get("id").map(|id| match id.as_str() {
                Some(id) => id.to_string(),
                None => id.to_string(),
            })
        }
        Err(e) => {
            error!("failed to persist interview record: {e}");
            outcome.errors.push(e.to_string());
            None
        }
    };

    let rendered = req.transcript.render_final();
    if rendered.is_empty() {
        outcome.errors.push("empty transcript, analysis skipped".to_string());
        return;
    }

    let analysis = match analyst
        .analyze_interview(&rendered, &req.candidate, &emotion_summary)
        .await
    {
        Ok(analysis) => analysis,
        Err(e) => {
            error!("interview analysis failed: {e}");
            outcome.errors.push(e.to_string());
            return;
        }
    };

    let fields = json!({
        "video_interview_id": interview_id,
        "candidate_id": req.candidate.candidate_id,
        "overall_impression": analysis.overall_impression.clone(),
        "confidence_score": analysis.confidence.score,
        "confidence_reasoning": analysis.confidence.reasoning.clone(),
        "expressiveness_score": analysis.expressiveness.score,
        "expressiveness_reasoning": analysis.expressiveness.reasoning.clone(),
        "knowledge_score": analysis.knowledge.score,
        "knowledge_reasoning": analysis.knowledge.reasoning.clone(),
        "communication_score": analysis.communication_skills.score,
        "communication_reasoning": analysis.communication_skills.reasoning.clone(),
        "strengths": analysis.strengths.clone(),
        "areas_for_improvement": analysis.areas_for_improvement.clone(),
        "emotion_summary": analysis.emotion_analysis.summary.clone(),
        "dominant_emotion": analysis.emotion_analysis.dominant_emotion.clone(),
    });
    if let Err(e) = store.create_record("interview_analyses", fields).await {
        error!("failed to persist interview analysis: {e}");
        outcome.errors.push(e.to_string());
    }

    outcome.analysis = Some(AnalysisResult::Interview(analysis));
}
