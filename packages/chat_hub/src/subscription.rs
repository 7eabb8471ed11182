use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::event::Event;
use crate::hub::HubRequest;

/// Identity of a subscriber feed inside the hub's registry
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct FeedId(pub u64);

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feed-{}", self.0)
    }
}

/// Receive-only end of a subscriber's delivery buffer.
///
/// The sending half never leaves the hub task, so a subscriber cannot
/// inject events into its own feed.
#[derive(Debug)]
pub struct Feed {
    id: FeedId,
    receiver: mpsc::Receiver<Event>,
}

impl Feed {
    pub(crate) fn new(id: FeedId, receiver: mpsc::Receiver<Event>) -> Self {
        Self { id, receiver }
    }

    pub fn id(&self) -> FeedId {
        self.id
    }

    /// Wait for the next event. `None` once the hub has released this feed.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Take an event if one is already buffered
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Discard everything currently buffered without waiting for more
    fn drain(&mut self) -> usize {
        let mut discarded = 0;
        while self.receiver.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}

/// What a client gets when it joins: the history at that moment plus a
/// live feed of everything published afterwards.
#[derive(Debug)]
pub struct Subscription {
    archive: Vec<Event>,
    feed: Feed,
    hub: mpsc::Sender<HubRequest>,
}

impl Subscription {
    pub(crate) fn new(archive: Vec<Event>, feed: Feed, hub: mpsc::Sender<HubRequest>) -> Self {
        Self { archive, feed, hub }
    }

    /// Events archived when the subscription was registered, oldest first
    pub fn archive(&self) -> &[Event] {
        &self.archive
    }

    /// Live events published after the archive snapshot was taken
    pub fn feed(&mut self) -> &mut Feed {
        &mut self.feed
    }

    pub fn id(&self) -> FeedId {
        self.feed.id
    }

    /// Leave the hub and release the feed.
    ///
    /// Asks the hub to unregister the feed without waiting for it to do so,
    /// then discards whatever is still buffered. The hub may have a publish
    /// for this feed in flight, so the feed keeps being drained while the
    /// unsubscribe request waits for room in the hub's queue. Returns the
    /// number of events thrown away.
    pub async fn cancel(self) -> usize {
        let Subscription { mut feed, hub, .. } = self;
        let id = feed.id;
        let mut discarded = 0;

        let request = hub.send(HubRequest::Unsubscribe { feed: id });
        tokio::pin!(request);

        loop {
            tokio::select! {
                result = &mut request => {
                    if result.is_err() {
                        debug!("Hub already stopped while cancelling {}", id);
                    }
                    break;
                }
                Some(_) = feed.receiver.recv() => {
                    discarded += 1;
                }
            }
        }

        discarded += feed.drain();
        debug!("Cancelled {} ({} pending events discarded)", id, discarded);
        discarded
    }
}
