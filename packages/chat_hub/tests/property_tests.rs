use proptest::prelude::*;

use chat_hub::{Archive, Event, HubActor, HubConfig};

// --- Archive bound and eviction ---

proptest! {
    #[test]
    fn archive_keeps_most_recent(n in 0usize..80, capacity in 0usize..30) {
        let mut archive = Archive::with_capacity(capacity);
        for i in 0..n {
            archive.push(Event::message("u", i.to_string()));
        }

        let kept = n.min(capacity);
        prop_assert_eq!(archive.len(), kept);

        let texts: Vec<String> = archive.iter().map(|e| e.text().to_string()).collect();
        let expected: Vec<String> = (n - kept..n).map(|i| i.to_string()).collect();
        prop_assert_eq!(texts, expected);
    }

    #[test]
    fn archive_never_exceeds_capacity(n in 0usize..80, capacity in 0usize..30) {
        let mut archive = Archive::with_capacity(capacity);
        for i in 0..n {
            archive.push(Event::join(i.to_string()));
            prop_assert!(archive.len() <= capacity);
        }
    }
}

// --- Snapshot consistency through the hub ---

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn snapshot_then_feed_covers_history(before in 0usize..40, after in 0usize..10) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (snapshot, live) = runtime.block_on(async move {
            let hub = HubActor::spawn(HubConfig::default()).unwrap();
            for i in 0..before {
                hub.say("u", &i.to_string()).await.unwrap();
            }
            let mut sub = hub.subscribe().await.unwrap();
            for i in before..before + after {
                hub.say("u", &i.to_string()).await.unwrap();
            }
            // Everything above has been fanned out once this returns
            hub.stats().await.unwrap();

            let snapshot: Vec<String> =
                sub.archive().iter().map(|e| e.text().to_string()).collect();
            let mut live = Vec::new();
            while let Some(event) = sub.feed().try_recv() {
                live.push(event.text().to_string());
            }
            sub.cancel().await;
            (snapshot, live)
        });

        let kept = before.min(20);
        let expected_snapshot: Vec<String> = (before - kept..before).map(|i| i.to_string()).collect();
        let expected_live: Vec<String> = (before..before + after).map(|i| i.to_string()).collect();
        prop_assert_eq!(snapshot, expected_snapshot);
        prop_assert_eq!(live, expected_live);
    }
}
