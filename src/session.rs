//! Dashboard Session
//!
//! One open dashboard page: the notification center, the real-time channel,
//! the page's widgets, its auto-refresh timers, the theme and the REST
//! client, wired together the way every page expects.
//!
//! ## Lifecycle
//!
//! ```text
//! new() --> start() --> [focus()]* --> shutdown()
//! ```
//!
//! `start()` loads the theme, installs the server event handlers, connects
//! and starts the page's status refresh. `shutdown()` tears everything down
//! in reverse.

use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::api::{ApiClient, LogNavigator, Navigator, RequestResult};
use crate::config::Config;
use crate::notify::NotificationCenter;
use crate::realtime::events::names;
use crate::realtime::{ChannelConfig, RealtimeChannel, ServerEvent, StatusSnapshot, Transport};
use crate::refresh::RefreshScheduler;
use crate::theme::{ThemeManager, ThemeStore};
use crate::widgets::{WidgetBackend, WidgetConfig, WidgetError, WidgetRegistry};

/// Name of the auto-refresh timer that reloads `/api/status`
pub const STATUS_REFRESH: &str = "status";

/// REST endpoint with the current system status
pub const STATUS_PATH: &str = "/api/status";

/// Page-specific behaviour plugged into a session
pub trait PageController: Send + Sync {
    fn name(&self) -> &str;

    /// Called for every status update, pushed or fetched
    fn on_status_update(&self, _status: &StatusSnapshot) {}

    /// Whether the page reloads `/api/status` on a timer
    fn auto_refresh(&self) -> bool {
        false
    }
}

/// Routes status snapshots to the page and the global badge
#[derive(Clone)]
struct StatusRouter {
    controller: Arc<dyn PageController>,
    badge: Arc<AtomicU64>,
}

impl StatusRouter {
    fn apply(&self, status: &StatusSnapshot) {
        if status.notifications.is_some() {
            self.badge.store(status.notification_count(), Ordering::SeqCst);
        }
        self.controller.on_status_update(status);
    }

    async fn load(&self, api: &ApiClient) -> anyhow::Result<()> {
        let status: StatusSnapshot = api.get_json(STATUS_PATH).await?;
        self.apply(&status);
        Ok(())
    }
}

/// Everything one dashboard page owns
pub struct DashboardSession<B: WidgetBackend> {
    config: Config,
    notifications: NotificationCenter,
    channel: RealtimeChannel,
    widgets: Mutex<WidgetRegistry<B>>,
    refresh: RefreshScheduler,
    theme: ThemeManager,
    api: ApiClient,
    status: StatusRouter,
}

impl<B: WidgetBackend> DashboardSession<B> {
    /// Session that logs notifications and redirects
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        backend: B,
        controller: Arc<dyn PageController>,
    ) -> RequestResult<Self> {
        let notifications = NotificationCenter::with_tracing(config.notifications.default_timeout());
        Self::with_parts(
            config,
            transport,
            backend,
            controller,
            notifications,
            Arc::new(LogNavigator),
        )
    }

    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        backend: B,
        controller: Arc<dyn PageController>,
        notifications: NotificationCenter,
        navigator: Arc<dyn Navigator>,
    ) -> RequestResult<Self> {
        let channel = RealtimeChannel::new(
            transport,
            ChannelConfig {
                reconnect_delay: config.realtime.reconnect_delay(),
            },
            notifications.clone(),
        );
        let api = ApiClient::new(config.api.clone(), notifications.clone(), navigator)?;
        let theme = ThemeManager::new(
            ThemeStore::new(&config.theme.state_file),
            notifications.clone(),
        );

        Ok(Self {
            config,
            notifications,
            channel,
            widgets: Mutex::new(WidgetRegistry::new(backend)),
            refresh: RefreshScheduler::new(),
            theme,
            api,
            status: StatusRouter {
                controller,
                badge: Arc::new(AtomicU64::new(0)),
            },
        })
    }

    /// Bring the page up
    pub fn start(&self) {
        let page = self.status.controller.name().to_string();
        let theme = self.theme.init();
        tracing::info!(page = %page, theme = %theme, "Starting dashboard session");

        self.install_handlers();
        self.channel.connect();

        if self.status.controller.auto_refresh() {
            let api = self.api.clone();
            let status = self.status.clone();
            self.refresh.start(STATUS_REFRESH, self.config.refresh.interval(), move || {
                let api = api.clone();
                let status = status.clone();
                async move { status.load(&api).await }
            });
        }
    }

    fn install_handlers(&self) {
        let status = self.status.clone();
        self.channel.on(names::STATUS_UPDATE, move |data: &Value| {
            let snapshot: StatusSnapshot = serde_json::from_value(data.clone())?;
            status.apply(&snapshot);
            Ok(())
        });

        let notifications = self.notifications.clone();
        self.channel.on(names::NOTIFICATION, move |data: &Value| {
            if let ServerEvent::Notification { message, severity } =
                ServerEvent::from_frame(names::NOTIFICATION, data)?
            {
                notifications.notify(message, severity, notifications.default_timeout());
            }
            Ok(())
        });

        let channel = self.channel.downgrade();
        self.channel.on(names::CONNECT, move |_: &Value| {
            if let Some(channel) = channel.upgrade() {
                channel.emit(names::REQUEST_STATUS, Value::Null)?;
            }
            Ok(())
        });
    }

    /// Create (or recreate) the widget at `key`.
    ///
    /// A missing mount point is reported to the user and leaves the rest of
    /// the page running; returns whether the widget exists afterwards.
    pub fn mount_widget(&self, key: &str, config: &WidgetConfig) -> bool {
        let result = self
            .widgets
            .lock()
            .create_or_update(key, config)
            .map(|_| ());

        match result {
            Ok(()) => true,
            Err(WidgetError::MountNotFound(key)) => {
                self.notifications.error(format!("Widget container not found: {}", key));
                false
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Widget creation failed");
                self.notifications.error(format!("Failed to create widget: {}", e));
                false
            }
        }
    }

    /// Exclusive access to the page's widgets
    pub fn widgets(&self) -> MutexGuard<'_, WidgetRegistry<B>> {
        self.widgets.lock()
    }

    /// Reload `/api/status` now. Failures are already reported to the user.
    pub async fn refresh_status(&self) -> anyhow::Result<()> {
        self.status.load(&self.api).await
    }

    /// The page became visible again: reconnect if the channel dropped and
    /// reload the status of auto-refreshing pages.
    pub async fn focus(&self) {
        self.channel.connect();
        if self.status.controller.auto_refresh() {
            if let Err(e) = self.refresh_status().await {
                tracing::debug!(error = %e, "Status reload on focus failed");
            }
        }
    }

    /// Tear the page down
    pub fn shutdown(&self) {
        let timers = self.refresh.stop_all();
        let widgets = self.widgets.lock().destroy_all();
        self.channel.shutdown();
        self.notifications.clear();
        tracing::info!(timers, widgets, "Dashboard session closed");
    }

    /// Pending-notification count from the latest status update
    pub fn notification_badge(&self) -> u64 {
        self.status.badge.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn channel(&self) -> &RealtimeChannel {
        &self.channel
    }

    pub fn refresh(&self) -> &RefreshScheduler {
        &self.refresh
    }

    pub fn theme(&self) -> &ThemeManager {
        &self.theme
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }
}
