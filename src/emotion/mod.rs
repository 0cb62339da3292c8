//! Facial-expression sampling and summarization for interview sessions
//!
//! While an interview is live, the sampler polls an [`ExpressionDetector`]
//! on a fixed interval and accumulates the confidence scores it returns.
//! Detection itself (face models, camera frames) is the device layer's
//! concern behind the trait; the engine only sees label→confidence maps.
//! At finalization the accumulated samples are folded into a one-line
//! summary for the analysis request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::debug;

/// Minimum top-label confidence for a sample to count toward the summary
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Minimum confidence on any label for a detection to be appended at all
pub const VALIDITY_THRESHOLD: f32 = 0.1;

/// Summary text when no samples were collected
pub const NO_DATA_SUMMARY: &str = "No facial expression data was collected.";

/// Summary text when no sample cleared the confidence threshold
pub const NO_CONFIDENT_SUMMARY: &str =
    "Could not confidently detect distinct facial expressions.";

/// One captured expression-confidence sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionSample {
    /// Expression label → confidence in [0, 1]
    pub scores: HashMap<String, f32>,
    pub timestamp: DateTime<Utc>,
}

/// Source of expression-confidence detections (camera + face model)
#[async_trait]
pub trait ExpressionDetector: Send + Sync {
    /// One detection attempt. `None` when no face is in view or the video
    /// feed is not currently playing.
    async fn detect(&self) -> Option<EmotionSample>;
}

/// Periodic sampling task driving an [`ExpressionDetector`]
pub struct EmotionSampler {
    task: JoinHandle<()>,
}

impl EmotionSampler {
    /// Spawn the sampling loop. Samples are only taken while `live` is
    /// set; detections with no label above the validity threshold are
    /// discarded rather than appended.
    pub fn spawn(
        detector: Arc<dyn ExpressionDetector>,
        live: Arc<AtomicBool>,
        sink: Arc<Mutex<Vec<EmotionSample>>>,
        every: Duration,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !live.load(Ordering::SeqCst) {
                    continue;
                }
                let Some(sample) = detector.detect().await else {
                    continue;
                };
                if sample.scores.values().all(|&v| v < VALIDITY_THRESHOLD) {
                    debug!("discarding expression sample below validity threshold");
                    continue;
                }
                if let Ok(mut samples) = sink.lock() {
                    samples.push(sample);
                }
            }
        });

        Self { task }
    }

    /// Stop sampling.
    pub fn stop(self) {
        self.task.abort();
    }
}

/// Summarize accumulated samples into a one-line human-readable report.
///
/// Each sample contributes its single highest-confidence label, and only
/// when that confidence exceeds 0.5; samples below the threshold for every
/// label are excluded from the count rather than mapped to a default.
pub fn summarize(samples: &[EmotionSample]) -> String {
    if samples.is_empty() {
        return NO_DATA_SUMMARY.to_string();
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut valid = 0usize;

    for sample in samples {
        let best = sample
            .scores
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal));
        if let Some((label, &score)) = best {
            if score > CONFIDENCE_THRESHOLD {
                valid += 1;
                *counts.entry(label.as_str()).or_insert(0) += 1;
            }
        }
    }

    if valid == 0 {
        return NO_CONFIDENT_SUMMARY.to_string();
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let breakdown = ranked
        .iter()
        .map(|(label, count)| {
            format!(
                "{} ({:.0}%)",
                capitalize(label),
                *count as f64 / valid as f64 * 100.0
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "The dominant emotion detected was '{}'. Breakdown: {}.",
        capitalize(ranked[0].0),
        breakdown
    )
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(scores: &[(&str, f32)]) -> EmotionSample {
        EmotionSample {
            scores: scores
                .iter()
                .map(|(label, score)| (label.to_string(), *score))
                .collect(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_no_samples_returns_no_data_sentinel() {
        assert_eq!(summarize(&[]), NO_DATA_SUMMARY);
    }

    #[test]
    fn test_all_below_threshold_returns_no_confident_sentinel() {
        let samples = vec![
            sample(&[("happy", 0.3), ("neutral", 0.2)]),
            sample(&[("sad", 0.45)]),
        ];
        assert_eq!(summarize(&samples), NO_CONFIDENT_SUMMARY);
    }

    #[test]
    fn test_plurality_label_and_breakdown() {
        let samples = vec![
            sample(&[("happy", 0.9)]),
            sample(&[("happy", 0.6)]),
            sample(&[("neutral", 0.7)]),
        ];
        assert_eq!(
            summarize(&samples),
            "The dominant emotion detected was 'Happy'. Breakdown: Happy (67%), Neutral (33%)."
        );
    }

    #[test]
    fn test_below_threshold_samples_excluded_from_count() {
        // the weak "sad" sample must not dilute the percentages
        let samples = vec![
            sample(&[("happy", 0.8)]),
            sample(&[("sad", 0.4)]),
            sample(&[("happy", 0.7)]),
        ];
        assert_eq!(
            summarize(&samples),
            "The dominant emotion detected was 'Happy'. Breakdown: Happy (100%)."
        );
    }

    #[test]
    fn test_highest_label_per_sample_wins() {
        let samples = vec![sample(&[("happy", 0.6), ("surprised", 0.9)])];
        assert_eq!(
            summarize(&samples),
            "The dominant emotion detected was 'Surprised'. Breakdown: Surprised (100%)."
        );
    }
}
