//! Dashboard Widgets
//!
//! Lifecycle management for charts and other widgets bound to mount points.
//!
//! ## Architecture
//!
//! - **WidgetRegistry**: at most one live widget per mount key
//! - **WidgetBackend**: constructs widgets; the registry never looks inside them
//! - **Chart presets**: serializable configurations for the dashboard charts
//! - **LoadingTracker**: loading-state bookkeeping for controls
//!
//! ## Example
//!
//! ```rust
//! use forwarder_dash::widgets::{chart, HeadlessBackend, WidgetRegistry};
//!
//! let mut registry = WidgetRegistry::new(HeadlessBackend::with_mounts(["success-rate"]));
//! registry.create_or_update("success-rate", &chart::success_rate_chart(98.5)).unwrap();
//! registry.update_data("success-rate", chart::success_rate_chart(97.0).data);
//! registry.destroy_all();
//! ```

pub mod chart;
mod headless;
mod loading;
mod registry;

pub use chart::{ChartData, ChartKind, Dataset, UpdateMode, WidgetConfig};
pub use headless::{HeadlessBackend, HeadlessWidget, WidgetProbe};
pub use loading::{ControlSurface, LoadingTracker, DEFAULT_LOADING_TEXT};
pub use registry::{Widget, WidgetBackend, WidgetError, WidgetHandle, WidgetRegistry};
