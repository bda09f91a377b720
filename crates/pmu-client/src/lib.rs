//! # pmu-client
//!
//! Consumer side of the PMU relay.
//!
//! A [`SubscriberSession`] keeps a WebSocket connection to the relay open,
//! reconnecting after a fixed delay whenever it drops, and maintains a
//! [`DashboardState`] from the envelopes it receives:
//!
//! ```no_run
//! use pmu_client::SubscriberSession;
//!
//! # async fn example() {
//! let session = SubscriberSession::new("ws://127.0.0.1:3001/");
//! let mut dashboard = session.dashboard();
//! tokio::spawn(async move { session.run().await });
//!
//! while dashboard.changed().await.is_ok() {
//!     if let Some(sync) = dashboard.borrow().synchronization() {
//!         println!("max deviation {:.2} deg", sync.max_angle_deviation());
//!     }
//! }
//! # }
//! ```

pub mod session;
pub mod state;

pub use session::{decode_envelope, ClientError, SubscriberSession, DEFAULT_RECONNECT_DELAY};
pub use state::{ConnectionEvent, ConnectionState, DashboardState};
