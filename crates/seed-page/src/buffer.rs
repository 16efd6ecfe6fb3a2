//! Playback buffer manager.
//!
//! Keeps many embedded players from buffering at once. Each control runs
//! the state machine below; the loading indicator is tracked beside it and
//! never changes the state.
//!
//! ```text
//!   MetadataOnly --Play--> Buffering --Playing--> Playing
//!        ^                     |                     |
//!        |                 Pause (remaining > far_from_end) -> PausedFarFromEnd (preload=metadata)
//!        |                 Pause (otherwise)                -> PausedNearEnd    (preload kept)
//!   release (off-screen, paused)
//! ```
//!
//! Waiting / Seeking switch the loading indicator on; Playing / CanPlay /
//! Seeked switch it off.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use seed_proto::config::PlaybackConfig;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::debug;

use crate::document::{AudioControl, Document, Viewport};

/// The `preload` hint handed to the media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Preload {
    /// Headers and duration only.
    Metadata,
    /// Full content.
    Auto,
}

impl Preload {
    pub fn as_attr(&self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferState {
    MetadataOnly,
    Buffering,
    Playing,
    PausedNearEnd,
    PausedFarFromEnd,
}

/// Native media element events the manager reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    Play,
    /// Carries the remaining duration at the moment of pausing, if known.
    Pause { remaining: Option<f64> },
    Waiting,
    Seeking,
    Playing,
    CanPlay,
    Seeked,
    Ended,
}

/// Result of one step: the new state plus any change to the preload hint
/// or the loading indicator (`None` = leave as is).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: BufferState,
    pub preload: Option<Preload>,
    pub loading: Option<bool>,
    pub paused: Option<bool>,
}

impl Transition {
    fn stay(state: BufferState) -> Self {
        Self {
            state,
            preload: None,
            loading: None,
            paused: None,
        }
    }
}

/// The transition table. Pure; `far_from_end` is the pause threshold in seconds.
pub fn transition(state: BufferState, event: MediaEvent, far_from_end: f64) -> Transition {
    match event {
        MediaEvent::Play => Transition {
            state: BufferState::Buffering,
            preload: Some(Preload::Auto),
            loading: None,
            paused: Some(false),
        },
        MediaEvent::Playing => Transition {
            state: BufferState::Playing,
            preload: None,
            loading: Some(false),
            paused: Some(false),
        },
        MediaEvent::Pause { remaining } => {
            // Unknown duration compares as "not far", like NaN would.
            let far = remaining.map(|r| r > far_from_end).unwrap_or(false);
            if far {
                Transition {
                    state: BufferState::PausedFarFromEnd,
                    preload: Some(Preload::Metadata),
                    loading: None,
                    paused: Some(true),
                }
            } else {
                Transition {
                    state: BufferState::PausedNearEnd,
                    preload: None,
                    loading: None,
                    paused: Some(true),
                }
            }
        }
        MediaEvent::Ended => Transition {
            state: BufferState::PausedNearEnd,
            preload: None,
            loading: Some(false),
            paused: Some(true),
        },
        MediaEvent::Waiting | MediaEvent::Seeking => Transition {
            loading: Some(true),
            ..Transition::stay(state)
        },
        MediaEvent::CanPlay | MediaEvent::Seeked => Transition {
            loading: Some(false),
            ..Transition::stay(state)
        },
    }
}

/// Run one event against a control.
pub fn apply_event(control: &mut AudioControl, event: MediaEvent, far_from_end: f64) -> BufferState {
    let step = transition(control.state, event, far_from_end);
    control.state = step.state;
    if let Some(preload) = step.preload {
        control.preload = preload;
    }
    if let Some(loading) = step.loading {
        control.loading = loading;
    }
    if let Some(paused) = step.paused {
        control.paused = paused;
    }
    step.state
}

/// Controls touched by one housekeeping pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HousekeepingReport {
    pub released: Vec<String>,
    pub restored: Vec<String>,
}

impl HousekeepingReport {
    pub fn is_empty(&self) -> bool {
        self.released.is_empty() && self.restored.is_empty()
    }
}

/// True when `control` sits more than `viewports` viewport heights above or
/// below the visible area.
pub fn is_far_offscreen(control: &AudioControl, viewport: &Viewport, viewports: f64) -> bool {
    let margin = viewport.height * viewports;
    let visible_top = viewport.scroll_top;
    let visible_bottom = viewport.scroll_top + viewport.height;
    control.rect.bottom() < visible_top - margin || control.rect.top > visible_bottom + margin
}

/// Release paused far-away controls and restore nearby released ones.
pub fn housekeep(doc: &mut Document, viewports: f64) -> HousekeepingReport {
    let viewport = doc.viewport;
    let mut report = HousekeepingReport::default();

    for control in doc.controls_mut() {
        let far = is_far_offscreen(control, &viewport, viewports);
        if far {
            if control.paused && control.src.is_some() {
                control.release();
                report.released.push(control.id.clone());
            }
        } else if control.src.is_none() {
            if let Some(src) = control.configured_src.clone() {
                control.attach(src);
                report.restored.push(control.id.clone());
            }
        }
    }

    if !report.is_empty() {
        debug!(
            "Buffer housekeeping: released {:?}, restored {:?}",
            report.released, report.restored
        );
    }
    report
}

/// Trailing-edge debounce: only the last scroll in a burst counts.
#[derive(Debug, Clone)]
pub struct ScrollDebounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl ScrollDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// (Re)arm the timer.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fire at most once per armed deadline.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Per-page buffer manager: owns the debounce timer and the tuning.
#[derive(Debug, Clone)]
pub struct PlaybackBufferManager {
    far_from_end_secs: f64,
    offscreen_viewports: f64,
    debounce: ScrollDebounce,
}

impl PlaybackBufferManager {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            far_from_end_secs: config.far_from_end_secs,
            offscreen_viewports: config.offscreen_viewports,
            debounce: ScrollDebounce::new(config.scroll_debounce()),
        }
    }

    pub fn far_from_end_secs(&self) -> f64 {
        self.far_from_end_secs
    }

    /// Route a media event to the control with `id`. Pause events without a
    /// remaining time get it from the control.
    pub fn dispatch(&self, doc: &mut Document, id: &str, event: MediaEvent) -> Option<BufferState> {
        let control = doc.control_mut(id)?;
        let event = match event {
            MediaEvent::Pause { remaining: None } => MediaEvent::Pause {
                remaining: control.remaining(),
            },
            other => other,
        };
        let state = apply_event(control, event, self.far_from_end_secs);
        debug!("{}: {:?} -> {:?} (preload={})", id, event, state, control.preload.as_attr());
        Some(state)
    }

    /// Record a scroll and arm the debounce.
    pub fn on_scroll(&mut self, doc: &mut Document, scroll_top: f64, now: Instant) {
        doc.viewport.scroll_top = scroll_top.max(0.0);
        self.debounce.trigger(now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Run housekeeping once the debounce has elapsed.
    pub fn poll(&mut self, doc: &mut Document, now: Instant) -> Option<HousekeepingReport> {
        if self.debounce.take_due(now) {
            Some(housekeep(doc, self.offscreen_viewports))
        } else {
            None
        }
    }

    /// Drive the debounce for a live page: scroll positions arrive on
    /// `scrolls`, housekeeping runs against the shared document. Returns
    /// when the sender side closes, after flushing a pending pass.
    pub async fn run_scroll_debounce(
        mut self,
        doc: Arc<Mutex<Document>>,
        mut scrolls: mpsc::Receiver<f64>,
        reports: Option<mpsc::Sender<HousekeepingReport>>,
    ) {
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                scroll = scrolls.recv() => match scroll {
                    Some(top) => {
                        let mut doc = doc.lock().await;
                        self.on_scroll(&mut doc, top, Instant::now());
                    }
                    None => break,
                },
                _ = sleep_until_opt(deadline) => {
                    let report = {
                        let mut doc = doc.lock().await;
                        self.poll(&mut doc, Instant::now())
                    };
                    if let (Some(report), Some(tx)) = (report, reports.as_ref()) {
                        let _ = tx.send(report).await;
                    }
                }
            }
        }

        if let Some(deadline) = self.next_deadline() {
            tokio::time::sleep_until(deadline).await;
            let report = {
                let mut doc = doc.lock().await;
                self.poll(&mut doc, Instant::now())
            };
            if let (Some(report), Some(tx)) = (report, reports.as_ref()) {
                let _ = tx.send(report).await;
            }
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
