//! # Forwarder Dashboard
//!
//! Client-side core of the forwarder admin console: the pieces every
//! dashboard page shares, without any rendering.
//!
//! ## Features
//!
//! - **Widgets**: keyed registry guaranteeing one live widget per mount point
//! - **Real-time**: reconnecting push channel with named event handlers
//! - **Notifications**: timed, dismissible user notifications
//! - **Auto-refresh**: named repeating timers, one per name
//! - **Theme**: persisted dark/light preference
//!
//! ## Modules
//!
//! - [`widgets`]: widget lifecycle registry and chart presets
//! - [`realtime`]: real-time channel, transports and server events
//! - [`notify`]: notification center
//! - [`refresh`]: auto-refresh scheduler
//! - [`api`]: REST client for the dashboard backend
//! - [`session`]: everything above wired together for one page
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forwarder_dash::config::Config;
//! use forwarder_dash::realtime::WsTransport;
//! use forwarder_dash::session::{DashboardSession, PageController};
//! use forwarder_dash::widgets::{chart, HeadlessBackend};
//! use std::sync::Arc;
//!
//! struct Overview;
//!
//! impl PageController for Overview {
//!     fn name(&self) -> &str {
//!         "dashboard"
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let transport = Arc::new(
//!         WsTransport::new(config.realtime.url.clone())?
//!             .with_connect_timeout(config.realtime.connect_timeout()),
//!     );
//!
//!     let session = DashboardSession::new(
//!         config,
//!         transport,
//!         HeadlessBackend::with_mounts(["message-chart"]),
//!         Arc::new(Overview),
//!     )?;
//!     session.start();
//!     session.mount_widget("message-chart", &chart::message_chart(None));
//!
//!     tokio::signal::ctrl_c().await?;
//!     session.shutdown();
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod format;
pub mod notify;
pub mod realtime;
pub mod refresh;
pub mod session;
pub mod theme;
pub mod timing;
pub mod widgets;

// Re-export top-level types for convenience
pub use api::{ApiClient, Navigator, RequestError};

pub use config::{Config, ConfigError};

pub use notify::{NotificationCenter, NotificationId, NotificationRecord, NotificationSink, Severity};

pub use realtime::{
    ChannelState, Frame, LoopbackTransport, RealtimeChannel, ServerEvent, StatusSnapshot,
    Transport, WsTransport,
};

pub use refresh::RefreshScheduler;

pub use session::{DashboardSession, PageController};

pub use theme::{Theme, ThemeManager};

pub use widgets::{
    ChartKind, HeadlessBackend, Widget, WidgetBackend, WidgetConfig, WidgetError, WidgetRegistry,
};
