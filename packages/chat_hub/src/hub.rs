use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::archive::Archive;
use crate::config::HubConfig;
use crate::error::HubError;
use crate::event::Event;
use crate::subscription::{Feed, FeedId, Subscription};

/// Counts reported by [`HubHandle::stats`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubStats {
    pub subscribers: usize,
    pub archived: usize,
}

/// Requests serviced by the hub task, one at a time, in queue order
pub(crate) enum HubRequest {
    Subscribe {
        respond_to: oneshot::Sender<Registration>,
    },
    Unsubscribe {
        feed: FeedId,
    },
    Publish {
        event: Event,
    },
    History {
        respond_to: oneshot::Sender<Vec<Event>>,
    },
    Stats {
        respond_to: oneshot::Sender<HubStats>,
    },
    Shutdown {
        respond_to: oneshot::Sender<()>,
    },
}

/// What the hub hands back for a subscribe request
pub(crate) struct Registration {
    pub(crate) archive: Vec<Event>,
    pub(crate) feed: Feed,
}

/// Handle to communicate with the hub task.
///
/// Cloning is cheap; every clone talks to the same hub. The handle can only
/// request work, it never touches the registry or the archive itself.
#[derive(Clone, Debug)]
pub struct HubHandle {
    sender: mpsc::Sender<HubRequest>,
}

impl HubHandle {
    /// Register a new feed and take a copy of the history as it stands now
    pub async fn subscribe(&self) -> Result<Subscription, HubError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(HubRequest::Subscribe { respond_to: tx })
            .await
            .map_err(|_| HubError::Closed)?;
        let registration = rx.await.map_err(|_| HubError::Closed)?;
        Ok(Subscription::new(
            registration.archive,
            registration.feed,
            self.sender.clone(),
        ))
    }

    /// Announce that `user` entered the room
    pub async fn join(&self, user: &str) -> Result<(), HubError> {
        self.publish(Event::join(user)).await
    }

    /// Broadcast a chat message from `user`
    pub async fn say(&self, user: &str, text: &str) -> Result<(), HubError> {
        self.publish(Event::message(user, text)).await
    }

    /// Announce that `user` left the room
    pub async fn leave(&self, user: &str) -> Result<(), HubError> {
        self.publish(Event::leave(user)).await
    }

    pub(crate) async fn publish(&self, event: Event) -> Result<(), HubError> {
        self.sender
            .send(HubRequest::Publish { event })
            .await
            .map_err(|_| HubError::Closed)
    }

    /// Copy of the archive without registering a feed
    pub async fn history(&self) -> Result<Vec<Event>, HubError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(HubRequest::History { respond_to: tx })
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(HubRequest::Stats { respond_to: tx })
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Stop accepting requests and stop the hub once the queue is empty.
    ///
    /// Requests queued before this returns are still serviced. Afterwards
    /// every feed is released, so subscribers see their feed end.
    pub async fn shutdown(&self) -> Result<(), HubError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(HubRequest::Shutdown { respond_to: tx })
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// True once the hub no longer accepts requests
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

struct Subscriber {
    id: FeedId,
    sender: mpsc::Sender<Event>,
}

/// The hub task: sole owner of the subscriber registry and the archive
pub struct HubActor {
    archive: Archive,
    subscribers: Vec<Subscriber>,
    feed_capacity: usize,
    next_feed_id: u64,
    receiver: mpsc::Receiver<HubRequest>,
}

impl HubActor {
    /// Spawn the hub on the current tokio runtime and return a handle to it.
    ///
    /// The task runs until [`HubHandle::shutdown`] is called or every handle
    /// (including those held by subscriptions) has been dropped.
    pub fn spawn(config: HubConfig) -> Result<HubHandle, HubError> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.request_capacity);
        let actor = Self {
            archive: Archive::with_capacity(config.archive_capacity),
            subscribers: Vec::new(),
            feed_capacity: config.feed_capacity,
            next_feed_id: 1,
            receiver: rx,
        };

        tokio::spawn(actor.run());

        Ok(HubHandle { sender: tx })
    }

    async fn run(mut self) {
        info!(
            "Broadcast hub started (archive={}, feed buffer={})",
            self.archive.capacity(),
            self.feed_capacity
        );

        while let Some(request) = self.receiver.recv().await {
            match request {
                HubRequest::Subscribe { respond_to } => {
                    let registration = self.handle_subscribe();
                    if let Err(registration) = respond_to.send(registration) {
                        // Caller went away before the reply arrived
                        self.handle_unsubscribe(registration.feed.id());
                    }
                }
                HubRequest::Unsubscribe { feed } => {
                    self.handle_unsubscribe(feed);
                }
                HubRequest::Publish { event } => {
                    self.handle_publish(event).await;
                }
                HubRequest::History { respond_to } => {
                    let _ = respond_to.send(self.archive.snapshot());
                }
                HubRequest::Stats { respond_to } => {
                    let _ = respond_to.send(HubStats {
                        subscribers: self.subscribers.len(),
                        archived: self.archive.len(),
                    });
                }
                HubRequest::Shutdown { respond_to } => {
                    // No new requests; the ones already queued are still serviced
                    self.receiver.close();
                    let _ = respond_to.send(());
                }
            }
        }

        info!(
            "Broadcast hub shutting down, releasing {} feeds",
            self.subscribers.len()
        );
        self.subscribers.clear();
    }

    fn handle_subscribe(&mut self) -> Registration {
        let id = FeedId(self.next_feed_id);
        self.next_feed_id += 1;

        let (sender, receiver) = mpsc::channel(self.feed_capacity);
        self.subscribers.push(Subscriber { id, sender });
        debug!("Registered {} ({} subscribers)", id, self.subscribers.len());

        Registration {
            archive: self.archive.snapshot(),
            feed: Feed::new(id, receiver),
        }
    }

    fn handle_unsubscribe(&mut self, id: FeedId) {
        if let Some(pos) = self.subscribers.iter().position(|s| s.id == id) {
            self.subscribers.remove(pos);
            debug!("Unregistered {} ({} subscribers)", id, self.subscribers.len());
        }
    }

    async fn handle_publish(&mut self, event: Event) {
        let mut closed = Vec::new();

        // Waits for buffer space on each feed in turn
        for subscriber in &self.subscribers {
            if subscriber.sender.send(event.clone()).await.is_err() {
                closed.push(subscriber.id);
            }
        }

        for id in closed {
            debug!("Feed {} was dropped without cancelling, pruning", id);
            self.handle_unsubscribe(id);
        }

        self.archive.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn spawn_default() -> HubHandle {
        HubActor::spawn(HubConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn spawn_rejects_invalid_config() {
        let config = HubConfig {
            feed_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            HubActor::spawn(config),
            Err(HubError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn subscribe_registers_feed() {
        let hub = spawn_default().await;
        let sub = hub.subscribe().await.unwrap();
        assert!(sub.archive().is_empty());

        let stats = hub.stats().await.unwrap();
        assert_eq!(stats.subscribers, 1);
        assert_eq!(stats.archived, 0);
    }

    #[tokio::test]
    async fn feed_ids_are_unique() {
        let hub = spawn_default().await;
        let a = hub.subscribe().await.unwrap();
        let b = hub.subscribe().await.unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn publish_reaches_subscriber_and_archive() {
        let hub = spawn_default().await;
        let mut sub = hub.subscribe().await.unwrap();

        hub.say("alice", "hello").await.unwrap();

        let event = sub.feed().recv().await.unwrap();
        assert_eq!(event.kind(), EventKind::Message);
        assert_eq!(event.text(), "hello");

        let history = hub.history().await.unwrap();
        assert_eq!(history, vec![event]);
    }

    #[tokio::test]
    async fn unsubscribe_unknown_feed_is_noop() {
        let hub = spawn_default().await;
        let _sub = hub.subscribe().await.unwrap();

        hub.sender
            .send(HubRequest::Unsubscribe { feed: FeedId(999) })
            .await
            .unwrap();
        assert_eq!(hub.stats().await.unwrap().subscribers, 1);
    }

    #[tokio::test]
    async fn double_unsubscribe_is_harmless() {
        let hub = spawn_default().await;
        let sub = hub.subscribe().await.unwrap();
        let mut other = hub.subscribe().await.unwrap();
        let id = sub.id();

        for _ in 0..2 {
            hub.sender
                .send(HubRequest::Unsubscribe { feed: id })
                .await
                .unwrap();
        }
        assert_eq!(hub.stats().await.unwrap().subscribers, 1);

        hub.join("carol").await.unwrap();
        let event = other.feed().recv().await.unwrap();
        assert_eq!(event.user(), "carol");
    }

    #[tokio::test]
    async fn dropped_feed_is_pruned_on_publish() {
        let hub = spawn_default().await;
        let sub = hub.subscribe().await.unwrap();
        drop(sub);

        hub.join("bob").await.unwrap();
        assert_eq!(hub.stats().await.unwrap().subscribers, 0);
        assert_eq!(hub.stats().await.unwrap().archived, 1);
    }

    #[tokio::test]
    async fn shutdown_ends_feeds_and_closes_handle() {
        let hub = spawn_default().await;
        let mut sub = hub.subscribe().await.unwrap();

        hub.shutdown().await.unwrap();

        let end = timeout(Duration::from_secs(1), sub.feed().recv())
            .await
            .unwrap();
        assert!(end.is_none());
        assert_eq!(hub.join("late").await, Err(HubError::Closed));
        assert!(hub.is_closed());
    }

    #[tokio::test]
    async fn requests_queued_behind_shutdown_are_serviced() {
        let hub = HubActor::spawn(HubConfig {
            feed_capacity: 1,
            ..Default::default()
        })
        .unwrap();
        let mut sub = hub.subscribe().await.unwrap();

        // "0" fills the feed, the hub then waits on it while delivering "1"
        hub.say("a", "0").await.unwrap();
        hub.say("a", "1").await.unwrap();

        let stopper = hub.clone();
        let shutdown = tokio::spawn(async move { stopper.shutdown().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!shutdown.is_finished());

        hub.say("late", "queued before close").await.unwrap();

        let mut got = Vec::new();
        while let Some(event) = timeout(Duration::from_secs(1), sub.feed().recv())
            .await
            .unwrap()
        {
            got.push(event.text().to_string());
        }
        assert_eq!(got, vec!["0", "1", "queued before close"]);

        shutdown.await.unwrap().unwrap();
        assert_eq!(hub.join("after").await, Err(HubError::Closed));
    }

    #[tokio::test]
    async fn subscription_outlives_dropped_handle() {
        let hub = spawn_default().await;
        let sub = hub.subscribe().await.unwrap();
        drop(hub);

        let discarded = timeout(Duration::from_secs(1), sub.cancel())
            .await
            .unwrap();
        assert_eq!(discarded, 0);
    }
}
