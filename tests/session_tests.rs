// End-to-end session scenarios over fake collaborators.
//
// The fakes count resource acquisitions and releases so the tests can
// verify that every exit path — clean stop, connect failure, stalled
// finalization — leaves zero resources outstanding and finalizes at most
// once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use voxhire::agent::client::{AgentConnection, AgentConnector};
use voxhire::agent::messages::{AgentEvent, MediaMessage};
use voxhire::analysis::{
    Analyst, CallAnalysis, EmotionAnalysis, InterviewAnalysis, MetricScore,
};
use voxhire::capture::source::{CaptureConfig, CaptureFactory, CaptureSource, VideoSource};
use voxhire::emotion::{EmotionSample, ExpressionDetector};
use voxhire::error::{Result, SessionError};
use voxhire::session::{
    CandidateContext, Session, SessionConfig, SessionDeps, SessionKind, SessionState,
};
use voxhire::store::RecruitStore;
use voxhire::transcript::Speaker;
use voxhire::{AudioFrame, FrameSource};

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct Counters {
    capture_acquired: AtomicUsize,
    capture_released: AtomicUsize,
    agent_opened: AtomicUsize,
    agent_closed: AtomicUsize,
    frames_received: AtomicUsize,
    uploads: AtomicUsize,
    analyses: AtomicUsize,
}

impl Counters {
    fn outstanding(&self) -> usize {
        (self.capture_acquired.load(Ordering::SeqCst)
            - self.capture_released.load(Ordering::SeqCst))
            + (self.agent_opened.load(Ordering::SeqCst) - self.agent_closed.load(Ordering::SeqCst))
    }
}

struct FakeCaptureSource {
    counters: Arc<Counters>,
    deny: bool,
    // held open so the capture stream does not end on its own
    keep: Option<mpsc::Sender<AudioFrame>>,
}

#[async_trait]
impl CaptureSource for FakeCaptureSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.deny {
            return Err(SessionError::PermissionDenied(
                "microphone access refused".to_string(),
            ));
        }
        self.counters.capture_acquired.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(8);
        for i in 0..2 {
            let _ = tx.try_send(AudioFrame {
                samples: vec![100; 4096],
                sample_rate: 16_000,
                channels: 1,
                timestamp_ms: i * 256,
                source: FrameSource::Local,
            });
        }
        self.keep = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if self.keep.take().is_some() {
            self.counters.capture_released.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeVideoSource {
    keep: Option<mpsc::Sender<Vec<u8>>>,
}

#[async_trait]
impl VideoSource for FakeVideoSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<Vec<u8>>> {
        let (tx, rx) = mpsc::channel(8);
        let _ = tx.try_send(vec![0xde, 0xad]);
        let _ = tx.try_send(vec![0xbe, 0xef]);
        self.keep = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.keep = None;
        Ok(())
    }
}

struct FakeCaptureFactory {
    counters: Arc<Counters>,
    deny: bool,
    with_video: bool,
}

impl CaptureFactory for FakeCaptureFactory {
    fn create_audio(&self, _config: &CaptureConfig) -> Result<Box<dyn CaptureSource>> {
        Ok(Box::new(FakeCaptureSource {
            counters: Arc::clone(&self.counters),
            deny: self.deny,
            keep: None,
        }))
    }

    fn create_video(&self) -> Result<Option<Box<dyn VideoSource>>> {
        if self.with_video {
            Ok(Some(Box::new(FakeVideoSource { keep: None })))
        } else {
            Ok(None)
        }
    }
}

struct FakeAgentConnection {
    counters: Arc<Counters>,
    // holding this keeps the inbound event stream open until close()
    _events_tx: mpsc::Sender<AgentEvent>,
    closed: bool,
}

#[async_trait]
impl AgentConnection for FakeAgentConnection {
    async fn send_media(&mut self, _message: MediaMessage) -> Result<()> {
        self.counters.frames_received.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.counters.agent_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

struct FakeAgentConnector {
    counters: Arc<Counters>,
    fail: bool,
    scripted: Vec<AgentEvent>,
}

#[async_trait]
impl AgentConnector for FakeAgentConnector {
    async fn connect(
        &self,
        _session_id: &str,
        _system_instruction: &str,
    ) -> Result<(Box<dyn AgentConnection>, mpsc::Receiver<AgentEvent>)> {
        if self.fail {
            return Err(SessionError::ConnectFailed(
                "agent service unavailable".to_string(),
            ));
        }
        self.counters.agent_opened.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(64);
        for event in &self.scripted {
            let _ = tx.try_send(event.clone());
        }
        Ok((
            Box::new(FakeAgentConnection {
                counters: Arc::clone(&self.counters),
                _events_tx: tx,
                closed: false,
            }),
            rx,
        ))
    }
}

#[derive(Default)]
struct FakeStore {
    counters: Arc<Counters>,
    records: Mutex<Vec<(String, Value)>>,
    statuses: Mutex<Vec<(String, String)>>,
    uploaded: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl RecruitStore for FakeStore {
    async fn upload_artifact(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        bucket: &str,
        path: &str,
    ) -> Result<String> {
        self.counters.uploads.fetch_add(1, Ordering::SeqCst);
        self.uploaded
            .lock()
            .unwrap()
            .push((content_type.to_string(), bytes.len()));
        Ok(format!("mem://{bucket}/{path}"))
    }

    async fn create_record(&self, table: &str, fields: Value) -> Result<Value> {
        self.records
            .lock()
            .unwrap()
            .push((table.to_string(), fields));
        Ok(json!({ "id": "rec-1" }))
    }

    async fn update_status(&self, candidate_id: &str, status: &str) -> Result<()> {
        self.statuses
            .lock()
            .unwrap()
            .push((candidate_id.to_string(), status.to_string()));
        Ok(())
    }
}

struct FakeAnalyst {
    counters: Arc<Counters>,
    stall: bool,
}

#[async_trait]
impl Analyst for FakeAnalyst {
    async fn analyze_call(
        &self,
        _transcript: &str,
        _ctx: &CandidateContext,
    ) -> Result<CallAnalysis> {
        if self.stall {
            tokio::time::sleep(Duration::from_secs(120)).await;
        }
        self.counters.analyses.fetch_add(1, Ordering::SeqCst);
        Ok(CallAnalysis {
            confirmed_slot: "Wednesday at 2 PM".to_string(),
            summary: "Slot confirmed.".to_string(),
            personality_analysis: "Polite and direct.".to_string(),
        })
    }

    async fn analyze_interview(
        &self,
        _transcript: &str,
        _ctx: &CandidateContext,
        emotion_summary: &str,
    ) -> Result<InterviewAnalysis> {
        self.counters.analyses.fetch_add(1, Ordering::SeqCst);
        let metric = MetricScore {
            score: 8,
            reasoning: "solid".to_string(),
        };
        Ok(InterviewAnalysis {
            overall_impression: "Strong".to_string(),
            confidence: metric.clone(),
            expressiveness: metric.clone(),
            knowledge: metric.clone(),
            communication_skills: metric,
            strengths: vec!["systems".to_string()],
            areas_for_improvement: vec!["testing".to_string()],
            emotion_analysis: EmotionAnalysis {
                summary: emotion_summary.to_string(),
                dominant_emotion: "Happy".to_string(),
            },
        })
    }
}

struct HappyDetector;

#[async_trait]
impl ExpressionDetector for HappyDetector {
    async fn detect(&self) -> Option<EmotionSample> {
        Some(EmotionSample {
            scores: [("happy".to_string(), 0.9f32)].into_iter().collect(),
            timestamp: chrono::Utc::now(),
        })
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    counters: Arc<Counters>,
    store: Arc<FakeStore>,
    deps: SessionDeps,
}

fn harness(deny_capture: bool, fail_connect: bool, scripted: Vec<AgentEvent>) -> Harness {
    let counters = Arc::new(Counters::default());
    let store = Arc::new(FakeStore {
        counters: Arc::clone(&counters),
        ..FakeStore::default()
    });
    let deps = SessionDeps {
        capture: Arc::new(FakeCaptureFactory {
            counters: Arc::clone(&counters),
            deny: deny_capture,
            with_video: true,
        }),
        agent: Arc::new(FakeAgentConnector {
            counters: Arc::clone(&counters),
            fail: fail_connect,
            scripted,
        }),
        store: Arc::clone(&store) as Arc<dyn RecruitStore>,
        analyst: Arc::new(FakeAnalyst {
            counters: Arc::clone(&counters),
            stall: false,
        }),
        detector: Some(Arc::new(HappyDetector)),
    };
    Harness {
        counters,
        store,
        deps,
    }
}

fn candidate() -> CandidateContext {
    CandidateContext {
        candidate_id: "cand-42".to_string(),
        candidate_name: "Dana Reyes".to_string(),
        job_title: "Backend Engineer".to_string(),
        department: "Platform".to_string(),
        job_description: "Build storage services.".to_string(),
        resume_highlights: Some("Score: 82/100".to_string()),
    }
}

async fn wait_for_state(session: &Session, target: SessionState) {
    let mut watcher = session.watch_state();
    tokio::time::timeout(Duration::from_secs(5), async {
        watcher.wait_for(|s| *s == target).await.unwrap();
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {target:?}, at {:?}", session.state()));
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_call_session_happy_path() {
    let scripted = vec![
        AgentEvent::Transcript {
            speaker: Speaker::Agent,
            text: "Good morning, am I".to_string(),
            is_final: false,
        },
        AgentEvent::Transcript {
            speaker: Speaker::Agent,
            text: "Good morning, am I speaking with Dana?".to_string(),
            is_final: true,
        },
        AgentEvent::Transcript {
            speaker: Speaker::Human,
            text: "Yes, Wednesday at 2 PM works.".to_string(),
            is_final: true,
        },
    ];
    let h = harness(false, false, scripted);
    let session = Session::new(
        SessionConfig::new(SessionKind::Call, candidate()),
        h.deps.clone(),
    );

    session.start();
    wait_for_state(&session, SessionState::Active).await;

    wait_until(|| session.transcript().len() == 2).await;

    session.stop().await;
    session.stop().await; // idempotent
    wait_for_state(&session, SessionState::Ended).await;

    // exactly two final entries survive the merge
    let transcript = session.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(
        transcript[0].text,
        "Good morning, am I speaking with Dana?"
    );
    assert_eq!(transcript[1].speaker, Speaker::Human);

    // one analysis, one persisted record, despite the double stop
    assert_eq!(h.counters.analyses.load(Ordering::SeqCst), 1);
    let records = h.store.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, "call_sessions");
    assert_eq!(records[0].1["confirmed_slot"], "Wednesday at 2 PM");

    let statuses = h.store.statuses.lock().unwrap();
    assert_eq!(
        *statuses,
        vec![("cand-42".to_string(), "call_completed".to_string())]
    );

    let outcome = session.outcome().expect("outcome present after Ended");
    assert!(!outcome.is_degraded(), "unexpected errors: {:?}", outcome.errors);
    assert!(outcome.artifact_url.is_some());

    // every acquired resource was released
    assert_eq!(h.counters.outstanding(), 0);
}

#[tokio::test]
async fn test_connect_failure_reaches_error_without_leaks() {
    let h = harness(false, true, Vec::new());
    let session = Session::new(
        SessionConfig::new(SessionKind::Call, candidate()),
        h.deps.clone(),
    );

    session.start();
    wait_for_state(&session, SessionState::Error).await;

    let message = session.error_message().unwrap();
    assert!(message.contains("could not open agent session"));

    // no finalization ran
    assert_eq!(h.counters.analyses.load(Ordering::SeqCst), 0);
    assert_eq!(h.counters.uploads.load(Ordering::SeqCst), 0);

    // capture was acquired and fully released
    assert_eq!(h.counters.capture_acquired.load(Ordering::SeqCst), 1);
    assert_eq!(h.counters.outstanding(), 0);
}

#[tokio::test]
async fn test_permission_denied_is_terminal() {
    let h = harness(true, false, Vec::new());
    let session = Session::new(
        SessionConfig::new(SessionKind::Call, candidate()),
        h.deps.clone(),
    );

    session.start();
    wait_for_state(&session, SessionState::Error).await;

    assert!(session
        .error_message()
        .unwrap()
        .contains("capture device access denied"));
    assert_eq!(h.counters.outstanding(), 0);
}

#[tokio::test]
async fn test_stop_from_idle_is_a_noop() {
    let h = harness(false, false, Vec::new());
    let session = Session::new(
        SessionConfig::new(SessionKind::Call, candidate()),
        h.deps.clone(),
    );

    session.stop().await;
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(h.counters.analyses.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_transport_error_routes_through_finalization() {
    let scripted = vec![
        AgentEvent::Transcript {
            speaker: Speaker::Agent,
            text: "Hello.".to_string(),
            is_final: true,
        },
        AgentEvent::Error {
            message: "stream reset".to_string(),
        },
    ];
    let h = harness(false, false, scripted);
    let session = Session::new(
        SessionConfig::new(SessionKind::Call, candidate()),
        h.deps.clone(),
    );

    session.start();
    // the transport error terminates the session without any stop() call
    wait_for_state(&session, SessionState::Ended).await;

    let outcome = session.outcome().unwrap();
    assert!(outcome.is_degraded());
    assert!(outcome.errors.iter().any(|e| e.contains("stream reset")));
    // finalization still ran to completion
    assert_eq!(h.counters.analyses.load(Ordering::SeqCst), 1);
    assert_eq!(h.counters.outstanding(), 0);
}

#[tokio::test]
async fn test_stalled_finalization_forces_ended() {
    let scripted = vec![AgentEvent::Transcript {
        speaker: Speaker::Agent,
        text: "Hello.".to_string(),
        is_final: true,
    }];
    let mut h = harness(false, false, scripted);
    h.deps.analyst = Arc::new(FakeAnalyst {
        counters: Arc::clone(&h.counters),
        stall: true,
    });

    let mut config = SessionConfig::new(SessionKind::Call, candidate());
    config.finalize_timeout = Duration::from_millis(300);
    let session = Session::new(config, h.deps.clone());

    session.start();
    wait_for_state(&session, SessionState::Active).await;
    wait_until(|| !session.transcript().is_empty()).await;
    session.stop().await;

    wait_for_state(&session, SessionState::Ended).await;

    let outcome = session.outcome().unwrap();
    assert!(outcome
        .errors
        .iter()
        .any(|e| e.contains("finalization did not complete")));
    assert!(outcome.analysis.is_none());

    // the stalled analysis never completed
    assert_eq!(h.counters.analyses.load(Ordering::SeqCst), 0);
    // resources were still released, exactly once
    assert_eq!(h.counters.agent_closed.load(Ordering::SeqCst), 1);
    assert_eq!(h.counters.outstanding(), 0);
}

#[tokio::test]
async fn test_interview_session_records_video_and_emotion() {
    let scripted = vec![
        AgentEvent::Transcript {
            speaker: Speaker::Agent,
            text: "Tell me about yourself".to_string(),
            is_final: false,
        },
        AgentEvent::TurnComplete,
        AgentEvent::Transcript {
            speaker: Speaker::Human,
            text: "I build storage engines.".to_string(),
            is_final: true,
        },
    ];
    let h = harness(false, false, scripted);

    let mut config = SessionConfig::new(SessionKind::Interview, candidate());
    config.emotion_interval = Duration::from_millis(10);
    let session = Session::new(config, h.deps.clone());

    session.start();
    wait_for_state(&session, SessionState::Active).await;
    wait_until(|| session.transcript().len() == 2).await;
    wait_until(|| session.stats().emotion_samples >= 2).await;

    session.stop().await;
    wait_for_state(&session, SessionState::Ended).await;

    // the artifact is the device-encoded video stream
    let uploads = h.store.uploaded.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, "video/webm");
    assert_eq!(uploads[0].1, 4); // two 2-byte chunks concatenated

    // interview record first, then its analysis record
    let records = h.store.records.lock().unwrap();
    let tables: Vec<&str> = records.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(tables, vec!["video_interviews", "interview_analyses"]);
    assert_eq!(records[1].1["video_interview_id"], "rec-1");

    // emotion summary made it into the interview record
    let emotion = records[0].1["emotion_data"].as_str().unwrap();
    assert!(emotion.contains("Happy"), "unexpected summary: {emotion}");

    assert_eq!(h.counters.outstanding(), 0);
}

#[tokio::test]
async fn test_retry_after_error_runs_a_fresh_attempt() {
    // first attempt fails to connect; flipping the connector lets the
    // retry reach Active with fresh resources
    let h = harness(false, true, Vec::new());
    let mut deps = h.deps.clone();

    let session = Session::new(SessionConfig::new(SessionKind::Call, candidate()), deps.clone());
    session.start();
    wait_for_state(&session, SessionState::Error).await;

    deps.agent = Arc::new(FakeAgentConnector {
        counters: Arc::clone(&h.counters),
        fail: false,
        scripted: vec![AgentEvent::Transcript {
            speaker: Speaker::Agent,
            text: "Hello again.".to_string(),
            is_final: true,
        }],
    });
    let retry = Session::new(SessionConfig::new(SessionKind::Call, candidate()), deps);
    retry.start();
    wait_for_state(&retry, SessionState::Active).await;

    retry.stop().await;
    wait_for_state(&retry, SessionState::Ended).await;
    assert_eq!(h.counters.outstanding(), 0);
}
