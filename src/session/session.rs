//! The session state machine
//!
//! `Idle → Connecting → Active → Analyzing → {Ended | Error}`. One run
//! task per attempt owns the resource bundle and consumes a single inbound
//! event channel; every capture frame, agent event, and stop request maps
//! to one transition in one place. The loop exits exactly once, so
//! finalization fires exactly once regardless of how termination was
//! triggered, and the owned resources are released by the one teardown
//! routine on every exit path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::agent::client::AgentConnector;
use crate::agent::instruction;
use crate::agent::messages::{AgentEvent, MediaMessage};
use crate::analysis::Analyst;
use crate::audio::codec;
use crate::audio::playback::{DecodedAudio, MonotonicClock, PlaybackScheduler};
use crate::capture::source::{CaptureConfig, CaptureFactory};
use crate::emotion::{self, EmotionSample, EmotionSampler, ExpressionDetector};
use crate::error::SessionError;
use crate::recording::{finalize, FinalizeRequest, Recorder, RecorderConfig};
use crate::session::config::{SessionConfig, SessionKind};
use crate::session::resources::SessionResources;
use crate::session::state::{SessionEvent, SessionOutcome, SessionState, SessionStats};
use crate::store::RecruitStore;
use crate::transcript::{DeltaAccumulator, IncomingFragment, Transcript, TranscriptEntry};

/// External collaborators a session needs
#[derive(Clone)]
pub struct SessionDeps {
    pub capture: Arc<dyn CaptureFactory>,
    pub agent: Arc<dyn AgentConnector>,
    pub store: Arc<dyn RecruitStore>,
    pub analyst: Arc<dyn Analyst>,
    /// Present when the deployment can sample facial expressions
    pub detector: Option<Arc<dyn ExpressionDetector>>,
}

/// A live session and its observable state
pub struct Session {
    shared: Arc<Shared>,
}

struct Shared {
    config: SessionConfig,
    deps: SessionDeps,
    state: Mutex<SessionState>,
    state_tx: watch::Sender<SessionState>,
    transcript: Mutex<Transcript>,
    emotion_samples: Arc<Mutex<Vec<EmotionSample>>>,
    outcome: Mutex<Option<SessionOutcome>>,
    error: Mutex<Option<String>>,
    started_at: Mutex<Option<DateTime<Utc>>>,
    events_tx: Mutex<Option<mpsc::Sender<SessionEvent>>>,
    frames_sent: AtomicUsize,
    chunks_played: AtomicUsize,
}

impl Shared {
    fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    fn transition(&self, to: SessionState) {
        *self.state.lock().unwrap() = to;
        self.state_tx.send_replace(to);
    }

    /// Record a terminal failure and enter `Error`.
    fn fail(&self, err: &SessionError) {
        error!("session failed: {err}");
        *self.error.lock().unwrap() = Some(err.to_string());
        self.transition(SessionState::Error);
    }
}

impl Session {
    pub fn new(config: SessionConfig, deps: SessionDeps) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            shared: Arc::new(Shared {
                config,
                deps,
                state: Mutex::new(SessionState::Idle),
                state_tx,
                transcript: Mutex::new(Transcript::new()),
                emotion_samples: Arc::new(Mutex::new(Vec::new())),
                outcome: Mutex::new(None),
                error: Mutex::new(None),
                started_at: Mutex::new(None),
                events_tx: Mutex::new(None),
                frames_sent: AtomicUsize::new(0),
                chunks_played: AtomicUsize::new(0),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.shared.config.session_id
    }

    pub fn kind(&self) -> SessionKind {
        self.shared.config.kind
    }

    /// Begin a session attempt. Valid from `Idle` or `Error`; anything
    /// else is ignored. Device acquisition and the agent connect happen
    /// asynchronously — observe progress through [`Session::watch_state`].
    pub fn start(&self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            match *state {
                SessionState::Idle | SessionState::Error => *state = SessionState::Connecting,
                other => {
                    warn!(state = ?other, "start ignored");
                    return;
                }
            }
        }
        self.shared.state_tx.send_replace(SessionState::Connecting);

        // a retry is a fresh attempt
        *self.shared.transcript.lock().unwrap() = Transcript::new();
        self.shared.emotion_samples.lock().unwrap().clear();
        *self.shared.outcome.lock().unwrap() = None;
        *self.shared.error.lock().unwrap() = None;
        self.shared.frames_sent.store(0, Ordering::Relaxed);
        self.shared.chunks_played.store(0, Ordering::Relaxed);

        info!(session_id = %self.shared.config.session_id, "session starting");
        tokio::spawn(run(Arc::clone(&self.shared)));
    }

    /// Request termination. Valid only while `Active`; a second call, or a
    /// call racing a transport close, is a no-op because the run loop only
    /// exits once.
    pub async fn stop(&self) {
        if self.shared.state() != SessionState::Active {
            debug!("stop ignored, session not active");
            return;
        }
        let tx = self.shared.events_tx.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.send(SessionEvent::Stop).await;
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Watch state transitions.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.shared.transcript.lock().unwrap().entries().to_vec()
    }

    /// Terminal outcome, present once the session reaches `Ended`.
    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.shared.outcome.lock().unwrap().clone()
    }

    /// Failure message, present in the `Error` state.
    pub fn error_message(&self) -> Option<String> {
        self.shared.error.lock().unwrap().clone()
    }

    pub fn stats(&self) -> SessionStats {
        let started_at = *self.shared.started_at.lock().unwrap();
        let duration_secs = match (*self.shared.outcome.lock().unwrap()).as_ref() {
            Some(outcome) => outcome.duration_secs as f64,
            None => started_at
                .map(|t| (Utc::now() - t).num_milliseconds() as f64 / 1000.0)
                .unwrap_or(0.0),
        };

        SessionStats {
            session_id: self.shared.config.session_id.clone(),
            kind: self.shared.config.kind,
            state: self.shared.state(),
            started_at,
            duration_secs,
            transcript_entries: self.shared.transcript.lock().unwrap().len(),
            frames_sent: self.shared.frames_sent.load(Ordering::Relaxed),
            audio_chunks_played: self.shared.chunks_played.load(Ordering::Relaxed),
            emotion_samples: self.shared.emotion_samples.lock().unwrap().len(),
            error: self.error_message(),
        }
    }
}

/// One session attempt, from device acquisition to the terminal state.
async fn run(shared: Arc<Shared>) {
    let config = shared.config.clone();
    let capture_config = CaptureConfig {
        sample_rate: config.capture_sample_rate,
        channels: 1,
        frame_samples: config.frame_samples,
    };

    // acquire capture devices; a refusal is terminal
    let mut audio = match shared.deps.capture.create_audio(&capture_config) {
        Ok(audio) => audio,
        Err(e) => return shared.fail(&e),
    };
    let audio_rx = match audio.start().await {
        Ok(rx) => rx,
        Err(e) => return shared.fail(&e),
    };

    let (video, video_rx) = if config.kind == SessionKind::Interview {
        match shared.deps.capture.create_video() {
            Ok(Some(mut video)) => match video.start().await {
                Ok(rx) => (Some(video), Some(rx)),
                Err(e) => {
                    SessionResources::new(audio, Some(video)).release().await;
                    return shared.fail(&e);
                }
            },
            Ok(None) => (None, None),
            Err(e) => {
                SessionResources::new(audio, None).release().await;
                return shared.fail(&e);
            }
        }
    } else {
        (None, None)
    };

    let mut resources = SessionResources::new(audio, video);

    // the recording sink runs from acquisition onward, independent of the
    // transport
    let recorder = Recorder::spawn(RecorderConfig {
        sample_rate: config.playback_sample_rate,
        channels: 1,
    });

    let (events_tx, mut events_rx) = mpsc::channel::<SessionEvent>(256);

    // capture pump: always taps the recorder; forwards frames for the
    // transport only while live (frames before `Active` are dropped, not
    // queued)
    {
        let tx = events_tx.clone();
        let tap = recorder.audio_tap();
        let live = Arc::clone(&resources.live);
        let mut audio_rx = audio_rx;
        resources.pumps.push(tokio::spawn(async move {
            while let Some(frame) = audio_rx.recv().await {
                let forward = live.load(Ordering::SeqCst);
                let _ = tap.send(frame.clone()).await;
                if forward && tx.send(SessionEvent::CaptureFrame(frame)).await.is_err() {
                    break;
                }
            }
            let _ = tx.send(SessionEvent::CaptureClosed).await;
        }));
    }

    // video pump: straight into the recording, no ordering relation to the
    // transport
    if let Some(mut video_rx) = video_rx {
        let tap = recorder.video_tap();
        resources.pumps.push(tokio::spawn(async move {
            while let Some(chunk) = video_rx.recv().await {
                if tap.send(chunk).await.is_err() {
                    break;
                }
            }
        }));
    }

    // open the duplex agent session; the machine stays `Connecting` until
    // this resolves
    let instruction_text = instruction::for_session(config.kind, &config.candidate);
    let (agent, agent_rx) = match shared
        .deps
        .agent
        .connect(&config.session_id, &instruction_text)
        .await
    {
        Ok(pair) => pair,
        Err(e) => {
            resources.release().await;
            drop(recorder);
            return shared.fail(&e);
        }
    };
    resources.agent = Some(agent);

    // agent pump
    {
        let tx = events_tx.clone();
        let mut agent_rx = agent_rx;
        resources.pumps.push(tokio::spawn(async move {
            while let Some(event) = agent_rx.recv().await {
                if tx.send(SessionEvent::Agent(event)).await.is_err() {
                    return;
                }
            }
            // stream exhausted without an explicit close
            let _ = tx.send(SessionEvent::Agent(AgentEvent::Closed)).await;
        }));
    }

    if config.kind == SessionKind::Interview {
        if let Some(detector) = &shared.deps.detector {
            resources.emotion = Some(EmotionSampler::spawn(
                Arc::clone(detector),
                Arc::clone(&resources.live),
                Arc::clone(&shared.emotion_samples),
                config.emotion_interval,
            ));
        }
    }

    let mut playback =
        PlaybackScheduler::new(Box::new(MonotonicClock::new()), recorder.audio_tap());

    *shared.started_at.lock().unwrap() = Some(Utc::now());
    *shared.events_tx.lock().unwrap() = Some(events_tx);
    resources.live.store(true, Ordering::SeqCst);
    shared.transition(SessionState::Active);
    info!(session_id = %config.session_id, "session active");

    // the run loop: the single consumer of every inbound event
    let mut accumulator = DeltaAccumulator::new();
    let mut sequence: u32 = 0;
    let mut termination_error: Option<String> = None;

    while let Some(event) = events_rx.recv().await {
        match event {
            SessionEvent::CaptureFrame(frame) => {
                let message = MediaMessage::from_frame(&config.session_id, sequence, &frame);
                sequence += 1;
                if let Some(agent) = resources.agent.as_mut() {
                    match agent.send_media(message).await {
                        Ok(()) => {
                            shared.frames_sent.fetch_add(1, Ordering::Relaxed);
                        }
                        // at-most-once: a frame that fails to send is gone
                        Err(e) => warn!("dropping capture frame: {e}"),
                    }
                }
            }
            SessionEvent::CaptureClosed => {
                info!("capture stream ended");
                break;
            }
            SessionEvent::Agent(agent_event) => match agent_event {
                AgentEvent::Transcript {
                    speaker,
                    text,
                    is_final,
                } => {
                    let fragment = if is_final {
                        accumulator.clear(speaker);
                        IncomingFragment {
                            speaker,
                            text,
                            is_final: true,
                        }
                    } else {
                        accumulator.delta(speaker, &text)
                    };
                    shared.transcript.lock().unwrap().apply(fragment);
                }
                AgentEvent::Audio { data } => match codec::decode_pcm(&data) {
                    Ok(samples) => {
                        playback
                            .enqueue(DecodedAudio {
                                samples,
                                sample_rate: config.playback_sample_rate,
                            })
                            .await;
                        shared.chunks_played.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => warn!("discarding undecodable agent audio: {e}"),
                },
                AgentEvent::TurnComplete => {
                    let mut transcript = shared.transcript.lock().unwrap();
                    for fragment in accumulator.turn_complete() {
                        transcript.apply(fragment);
                    }
                }
                AgentEvent::Interrupted => playback.interrupt(),
                AgentEvent::Closed => {
                    info!("agent closed the session");
                    break;
                }
                AgentEvent::Error { message } => {
                    let err = SessionError::Transport(message);
                    error!("{err}");
                    termination_error = Some(err.to_string());
                    break;
                }
            },
            SessionEvent::Stop => {
                info!("stop requested");
                break;
            }
        }
    }

    // the loop exits exactly once per attempt; everything below is the
    // single finalization path for stop, transport close, and transport
    // error alike
    shared.transition(SessionState::Analyzing);
    *shared.events_tx.lock().unwrap() = None;

    // halt local input, then drop every recording tap so the recorder can
    // flush
    resources.halt_input().await;
    drop(playback);
    drop(events_rx);

    let transcript_snapshot = {
        let mut snapshot = shared.transcript.lock().unwrap().clone();
        snapshot.finalize_all();
        snapshot
    };
    let emotion_summary = (config.kind == SessionKind::Interview)
        .then(|| emotion::summarize(&shared.emotion_samples.lock().unwrap()));

    let request = FinalizeRequest {
        session_id: config.session_id.clone(),
        kind: config.kind,
        candidate: config.candidate.clone(),
        transcript: transcript_snapshot,
        emotion_summary,
        termination_error,
    };

    let finalization = finalize::run(
        request,
        recorder,
        Arc::clone(&shared.deps.store),
        Arc::clone(&shared.deps.analyst),
    );
    let outcome = match tokio::time::timeout(config.finalize_timeout, finalization).await {
        Ok(outcome) => outcome,
        Err(_) => {
            let err = SessionError::FinalizeTimeout(config.finalize_timeout);
            error!("{err}");
            let mut outcome = SessionOutcome::new(&config.session_id, config.kind);
            outcome.errors.push(err.to_string());
            outcome
        }
    };

    resources.release().await;

    *shared.outcome.lock().unwrap() = Some(outcome);
    shared.transition(SessionState::Ended);
    info!(session_id = %config.session_id, "session ended");
}
