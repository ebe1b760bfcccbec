use std::path::Path;

use anyhow::Context as _;

use crate::{
    analysis::{
        checkerboard::checkerboard_area_duration,
        framediff::{fps, framediff_sums, unique_frames_from_diffsums},
        profile::AnalysisProfile,
        stableframe::stable_frame_time,
    },
    archive::{cache::AnalysisCache, store::FrameStore},
    foundation::{
        core::frames_to_secs,
        error::{FramecapError, FramecapResult},
    },
};

/// Diff-sum a frame needs before it counts as a visible response to input.
pub const INPUT_RESPONSE_THRESHOLD: u64 = 4096;

/// One scripted input event, timed in seconds from capture start.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    pub start: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Action {
    pub fn new(kind: impl Into<String>, start: f64) -> Self {
        Self {
            kind: kind.into(),
            start,
            extra: serde_json::Map::new(),
        }
    }

    pub fn is_sleep(&self) -> bool {
        self.kind == "sleep"
    }
}

/// Read a JSON array of actions.
pub fn load_actions(path: &Path) -> FramecapResult<Vec<Action>> {
    let bytes = std::fs::read(path).with_context(|| format!("read actions {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| FramecapError::serde(format!("actions {}: {e}", path.display())))
}

/// Seconds between the first non-sleep action and the first later diff-sum at or above
/// `threshold`. Diff-sum `i` is timed at `i / FRAME_RATE`.
pub fn response_time_from_diffsums(
    diffsums: &[u64],
    actions: &[Action],
    threshold: u64,
) -> Option<f64> {
    let action = actions.iter().find(|a| !a.is_sleep())?;
    diffsums.iter().enumerate().find_map(|(i, &d)| {
        let t = frames_to_secs(i);
        (action.start < t && d >= threshold).then(|| t - action.start)
    })
}

pub fn time_to_response(
    store: &FrameStore,
    cache: &AnalysisCache,
    actions: &[Action],
    threshold: u64,
) -> FramecapResult<Option<f64>> {
    if !actions.iter().any(|a| !a.is_sleep()) {
        return Ok(None);
    }
    Ok(response_time_from_diffsums(
        &framediff_sums(store, cache)?,
        actions,
        threshold,
    ))
}

/// Summary numbers reported for one capture.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct StandardMetrics {
    pub unique_frames: usize,
    pub fps: f64,
    pub checkerboard: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_response: Option<f64>,
    pub stable_frame: f64,
}

#[tracing::instrument(skip_all, fields(archive = %store.path().display(), device = %profile.device))]
pub fn standard_metrics(
    store: &FrameStore,
    cache: &AnalysisCache,
    profile: &AnalysisProfile,
    actions: &[Action],
) -> FramecapResult<StandardMetrics> {
    let diffsums = framediff_sums(store, cache)?;
    let metrics = StandardMetrics {
        unique_frames: unique_frames_from_diffsums(&diffsums, profile.unique_frame_threshold),
        fps: fps(store, cache, profile.unique_frame_threshold)?,
        checkerboard: checkerboard_area_duration(store, cache)?,
        time_to_response: response_time_from_diffsums(
            &diffsums,
            actions,
            INPUT_RESPONSE_THRESHOLD,
        ),
        stable_frame: stable_frame_time(store, cache, profile.stability)?,
    };
    tracing::info!(
        unique_frames = metrics.unique_frames,
        fps = metrics.fps,
        "metrics computed"
    );
    Ok(metrics)
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/metrics.rs"]
mod tests;
