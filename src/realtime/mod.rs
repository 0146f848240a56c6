//! Real-Time Status Channel
//!
//! Keeps the dashboard connected to the server's push channel.
//!
//! ## Architecture
//!
//! - **RealtimeChannel**: connection state machine, handler table, reconnects
//! - **Transport**: opens connections (`WsTransport`, `LoopbackTransport`)
//! - **ServerEvent**: typed view over inbound frames
//!
//! ## Wire format
//!
//! Every frame, in both directions, is a JSON text message:
//!
//! ```json
//! {"event": "status_update", "data": {"cpu": 12.5, "notifications": {"count": 2}}}
//! ```

mod channel;
pub mod events;
mod transport;
mod ws;

pub use channel::{
    ChannelConfig, ChannelError, ChannelState, EventHandler, HandlerError, RealtimeChannel,
    WeakChannel,
};
pub use events::{NotificationCount, ServerEvent, StatusSnapshot};
pub use transport::{Connection, Frame, LoopbackPeer, LoopbackTransport, Transport, TransportError};
pub use ws::WsTransport;
