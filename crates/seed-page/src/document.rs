//! Headless page: containers of rendered fragments, the audio controls
//! inside them, the modal player and the viewport.
//!
//! Nothing here knows about fetching or buffering policy; it is the
//! surface the renderer writes to and the buffer manager mutates.

use serde::Serialize;

use crate::buffer::{BufferState, Preload};
use crate::render;

pub const EPISODES_CONTAINER: &str = "episodes-container";
pub const ARCHIVE_CONTAINER: &str = "archive-container";
pub const LOAD_MORE_CONTAINER: &str = "load-more-container";
pub const MODAL_ID: &str = "latest-modal";
pub const MODAL_AUDIO_ID: &str = "latest-audio";

/// Vertical layout box in document coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub top: f64,
    pub height: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub scroll_top: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll_top: 0.0,
            height: 900.0,
        }
    }
}

/// One embedded audio player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioControl {
    pub id: String,
    /// Source the control was rendered with; survives unloading.
    pub configured_src: Option<String>,
    /// Source currently attached. `None` once buffered media was released.
    pub src: Option<String>,
    pub preload: Preload,
    pub state: BufferState,
    /// Loading indicator, independent of `state`.
    pub loading: bool,
    pub paused: bool,
    pub current_time: f64,
    pub duration: Option<f64>,
    pub rect: Rect,
    pub label: Option<String>,
    /// How many times a source was (re)attached.
    pub load_count: u32,
}

impl AudioControl {
    pub fn new(id: impl Into<String>, src: Option<String>) -> Self {
        let load_count = u32::from(src.is_some());
        Self {
            id: id.into(),
            configured_src: src.clone(),
            src,
            preload: Preload::Metadata,
            state: BufferState::MetadataOnly,
            loading: false,
            paused: true,
            current_time: 0.0,
            duration: None,
            rect: Rect::default(),
            label: None,
            load_count,
        }
    }

    /// Seconds left until the end, if the duration is known.
    pub fn remaining(&self) -> Option<f64> {
        self.duration
            .filter(|d| d.is_finite())
            .map(|d| (d - self.current_time).max(0.0))
    }

    /// Attach `src` and count it as a load.
    pub fn attach(&mut self, src: String) {
        self.src = Some(src);
        self.load_count += 1;
    }

    /// Drop the attached source and everything buffered for it.
    pub fn release(&mut self) {
        self.src = None;
        self.preload = Preload::Metadata;
        self.state = BufferState::MetadataOnly;
        self.loading = false;
        self.current_time = 0.0;
    }
}

/// One card-sized piece of rendered content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fragment {
    Episode {
        key: String,
        title: String,
        date: String,
        control_id: String,
    },
    Archive {
        key: String,
        title: String,
        recorded: String,
        size_mb: String,
        url: String,
    },
    ErrorPanel {
        message: String,
        retry_href: String,
    },
    LoadMore {
        enabled: bool,
        next_page: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Container {
    pub id: String,
    pub fragments: Vec<Fragment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Modal {
    pub open: bool,
    pub control: AudioControl,
}

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub title: String,
    containers: Vec<Container>,
    /// Card controls in render order.
    controls: Vec<AudioControl>,
    pub modal: Modal,
    pub viewport: Viewport,
    /// Height given to every card when laying out audio controls.
    pub card_height: f64,
    next_top: f64,
}

impl Document {
    pub fn new(title: impl Into<String>, container_ids: &[&str]) -> Self {
        Self {
            title: title.into(),
            containers: container_ids
                .iter()
                .map(|id| Container {
                    id: (*id).to_string(),
                    fragments: Vec::new(),
                })
                .collect(),
            controls: Vec::new(),
            modal: Modal {
                open: false,
                control: AudioControl::new(MODAL_AUDIO_ID, None),
            },
            viewport: Viewport::default(),
            card_height: 180.0,
            next_top: 0.0,
        }
    }

    pub fn container(&self, id: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.id == id)
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    fn container_mut(&mut self, id: &str) -> Option<&mut Container> {
        self.containers.iter_mut().find(|c| c.id == id)
    }

    /// Remove every fragment in `id` together with the controls it owned.
    pub fn clear(&mut self, id: &str) {
        let Some(container) = self.container_mut(id) else {
            return;
        };
        let owned: Vec<String> = container
            .fragments
            .drain(..)
            .filter_map(|f| match f {
                Fragment::Episode { control_id, .. } => Some(control_id),
                _ => None,
            })
            .collect();
        self.controls.retain(|c| !owned.contains(&c.id));
        if self.controls.is_empty() {
            self.next_top = 0.0;
        }
    }

    /// Append a fragment, laying out its control (if any) below the last one.
    /// Returns false when the container does not exist.
    pub fn append(&mut self, id: &str, fragment: Fragment, control: Option<AudioControl>) -> bool {
        if self.container(id).is_none() {
            return false;
        }
        if let Some(mut control) = control {
            control.rect = Rect {
                top: self.next_top,
                height: self.card_height,
            };
            self.next_top += self.card_height;
            match self.controls.iter_mut().find(|c| c.id == control.id) {
                Some(existing) => *existing = control,
                None => self.controls.push(control),
            }
        } else if matches!(fragment, Fragment::Archive { .. }) {
            self.next_top += self.card_height;
        }
        if let Some(container) = self.container_mut(id) {
            container.fragments.push(fragment);
        }
        true
    }

    pub fn control(&self, id: &str) -> Option<&AudioControl> {
        if id == MODAL_AUDIO_ID {
            return Some(&self.modal.control);
        }
        self.controls.iter().find(|c| c.id == id)
    }

    pub fn control_mut(&mut self, id: &str) -> Option<&mut AudioControl> {
        if id == MODAL_AUDIO_ID {
            return Some(&mut self.modal.control);
        }
        self.controls.iter_mut().find(|c| c.id == id)
    }

    /// Card controls (the modal player is not included).
    pub fn controls(&self) -> impl Iterator<Item = &AudioControl> {
        self.controls.iter()
    }

    pub fn controls_mut(&mut self) -> impl Iterator<Item = &mut AudioControl> {
        self.controls.iter_mut()
    }

    pub fn fragment_count(&self, id: &str, pred: impl Fn(&Fragment) -> bool) -> usize {
        self.container(id)
            .map(|c| c.fragments.iter().filter(|f| pred(f)).count())
            .unwrap_or(0)
    }

    pub fn to_html(&self) -> String {
        render::page_html(self)
    }
}
