//! Headless Widget Backend
//!
//! In-memory backend with a fixed set of mount points. Widgets keep their
//! configuration and count renders instead of drawing. Used by the CLI and
//! by tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::chart::{ChartData, ChartKind, UpdateMode, WidgetConfig};
use super::registry::{Widget, WidgetBackend, WidgetError};

/// Backend whose mount points are plain names
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    mounts: HashSet<String>,
    constructed: usize,
    destroyed: Arc<AtomicUsize>,
    failures: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mounts<I, S>(mounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mounts: mounts.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn add_mount(&mut self, key: impl Into<String>) {
        self.mounts.insert(key.into());
    }

    pub fn remove_mount(&mut self, key: &str) -> bool {
        self.mounts.remove(key)
    }

    /// Make the next `count` constructions fail
    pub fn fail_next(&mut self, count: usize) {
        self.failures = count;
    }

    /// Number of widgets ever constructed
    pub fn constructed(&self) -> usize {
        self.constructed
    }

    /// Number of constructed widgets not yet destroyed
    pub fn live(&self) -> usize {
        self.constructed - self.destroyed.load(Ordering::SeqCst)
    }
}

impl WidgetBackend for HeadlessBackend {
    type Mount = String;
    type Instance = HeadlessWidget;

    fn locate(&self, key: &str) -> Option<String> {
        self.mounts.get(key).cloned()
    }

    fn construct(&mut self, mount: String, config: &WidgetConfig) -> Result<HeadlessWidget, WidgetError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(WidgetError::Backend {
                key: mount,
                message: "construction refused".to_string(),
            });
        }

        self.constructed += 1;
        Ok(HeadlessWidget {
            mount,
            kind: config.kind,
            data: config.data.clone(),
            options: config.options.clone(),
            probe: WidgetProbe::default(),
            backend_destroyed: Arc::clone(&self.destroyed),
        })
    }
}

/// Observes a widget after the registry has dropped it
#[derive(Debug, Clone, Default)]
pub struct WidgetProbe {
    renders: Arc<AtomicUsize>,
    destroys: Arc<AtomicUsize>,
}

impl WidgetProbe {
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn destroy_count(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }
}

/// Widget that records what would have been drawn
#[derive(Debug)]
pub struct HeadlessWidget {
    mount: String,
    kind: ChartKind,
    data: ChartData,
    options: serde_json::Value,
    probe: WidgetProbe,
    backend_destroyed: Arc<AtomicUsize>,
}

impl HeadlessWidget {
    pub fn mount(&self) -> &str {
        &self.mount
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    pub fn options(&self) -> &serde_json::Value {
        &self.options
    }

    pub fn probe(&self) -> WidgetProbe {
        self.probe.clone()
    }
}

impl Widget for HeadlessWidget {
    fn data(&self) -> &ChartData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut ChartData {
        &mut self.data
    }

    fn update(&mut self, mode: UpdateMode) {
        self.probe.renders.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(mount = %self.mount, mode = ?mode, "Widget rendered");
    }

    fn destroy(&mut self) {
        self.probe.destroys.fetch_add(1, Ordering::SeqCst);
        self.backend_destroyed.fetch_add(1, Ordering::SeqCst);
    }
}
