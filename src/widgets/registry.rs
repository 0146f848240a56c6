//! Widget Registry
//!
//! Tracks live widget instances by mount key. At most one instance exists
//! per key; re-creating a key destroys the previous instance first.

use std::collections::HashMap;
use thiserror::Error;

use super::chart::{ChartData, ChartKind, UpdateMode, WidgetConfig};

/// A constructed widget as exposed by its backend
pub trait Widget: Send {
    fn data(&self) -> &ChartData;

    fn data_mut(&mut self) -> &mut ChartData;

    /// Re-render from the current data
    fn update(&mut self, mode: UpdateMode);

    /// Release backend resources. Called exactly once per instance.
    fn destroy(&mut self);
}

/// Constructs widgets at named mount points
pub trait WidgetBackend: Send {
    /// Reference to a located mount point
    type Mount;
    type Instance: Widget;

    /// Find the mount point for `key`
    fn locate(&self, key: &str) -> Option<Self::Mount>;

    /// Build a widget on `mount`
    fn construct(
        &mut self,
        mount: Self::Mount,
        config: &WidgetConfig,
    ) -> Result<Self::Instance, WidgetError>;
}

/// One live widget owned by the registry
#[derive(Debug)]
pub struct WidgetHandle<W> {
    key: String,
    kind: ChartKind,
    instance: W,
}

impl<W: Widget> WidgetHandle<W> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    pub fn instance(&self) -> &W {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut W {
        &mut self.instance
    }
}

/// Keyed collection of live widgets
pub struct WidgetRegistry<B: WidgetBackend> {
    backend: B,
    handles: HashMap<String, WidgetHandle<B::Instance>>,
}

impl<B: WidgetBackend> WidgetRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            handles: HashMap::new(),
        }
    }

    /// Create the widget for `key`, replacing any existing one.
    ///
    /// The previous instance is destroyed before the mount is looked up, so
    /// a failed call leaves no widget behind for `key`.
    pub fn create_or_update(
        &mut self,
        key: &str,
        config: &WidgetConfig,
    ) -> Result<&mut WidgetHandle<B::Instance>, WidgetError> {
        self.destroy(key);

        let mount = self.backend.locate(key).ok_or_else(|| {
            tracing::error!(key = %key, "Mount point not found");
            WidgetError::MountNotFound(key.to_string())
        })?;

        let instance = self.backend.construct(mount, config)?;
        tracing::debug!(key = %key, kind = ?config.kind, "Widget created");

        let handle = WidgetHandle {
            key: key.to_string(),
            kind: config.kind,
            instance,
        };
        Ok(self.handles.entry(key.to_string()).or_insert(handle))
    }

    /// Replace a widget's data and re-render it in place.
    ///
    /// Returns false (and does nothing) when no widget exists for `key`.
    pub fn update_data(&mut self, key: &str, data: ChartData) -> bool {
        match self.handles.get_mut(key) {
            Some(handle) => {
                *handle.instance.data_mut() = data;
                handle.instance.update(UpdateMode::Active);
                true
            }
            None => false,
        }
    }

    /// Push a sample onto a rolling series and redraw without animation
    pub fn push_point(&mut self, key: &str, value: f64) -> bool {
        match self.handles.get_mut(key) {
            Some(handle) => {
                if !handle.instance.data_mut().push_rolling(value) {
                    return false;
                }
                handle.instance.update(UpdateMode::None);
                true
            }
            None => false,
        }
    }

    /// Destroy the widget for `key`; returns false if there was none
    pub fn destroy(&mut self, key: &str) -> bool {
        match self.handles.remove(key) {
            Some(mut handle) => {
                handle.instance.destroy();
                tracing::debug!(key = %key, "Widget destroyed");
                true
            }
            None => false,
        }
    }

    /// Destroy every widget, returning how many were live
    pub fn destroy_all(&mut self) -> usize {
        let count = self.handles.len();
        for (_, mut handle) in self.handles.drain() {
            handle.instance.destroy();
        }
        if count > 0 {
            tracing::debug!(count, "All widgets destroyed");
        }
        count
    }

    pub fn get(&self, key: &str) -> Option<&WidgetHandle<B::Instance>> {
        self.handles.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handles.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

/// Errors that can occur when creating widgets
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("Mount point not found: {0}")]
    MountNotFound(String),

    #[error("Widget backend failed for {key}: {message}")]
    Backend { key: String, message: String },
}
