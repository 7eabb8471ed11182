//! Chat Hub - in-memory broadcast hub for a single chat room
//!
//! One tokio task owns the list of subscriber feeds and a bounded archive of
//! recent events. Everything else reaches it through a [`HubHandle`], so the
//! shared state is never locked: requests are serviced one at a time in the
//! order they were queued.
//!
//! # Example
//!
//! ```no_run
//! use chat_hub::{HubActor, HubConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let hub = HubActor::spawn(HubConfig::default()).unwrap();
//!
//!     let mut sub = hub.subscribe().await.unwrap();
//!     hub.join("alice").await.unwrap();
//!
//!     for event in sub.archive() {
//!         println!("history: {}", event);
//!     }
//!
//!     hub.say("alice", "hello").await.unwrap();
//!     while let Some(event) = sub.feed().recv().await {
//!         println!("live: {}", event);
//!         if event.text() == "hello" {
//!             break;
//!         }
//!     }
//!
//!     hub.leave("alice").await.unwrap();
//!     sub.cancel().await;
//! }
//! ```

mod archive;
mod config;
mod error;
mod event;
mod hub;
mod subscription;

pub use archive::{Archive, DEFAULT_ARCHIVE_CAPACITY};
pub use config::{DEFAULT_FEED_CAPACITY, DEFAULT_REQUEST_CAPACITY, HubConfig};
pub use error::HubError;
pub use event::{Event, EventKind};
pub use hub::{HubActor, HubHandle, HubStats};
pub use subscription::{Feed, FeedId, Subscription};
