//! Batched launch: admission, overflow spillover, duplicates, failures,
//! inter-batch backpressure.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{config_in, token, FakePlatform, RecordingNotify};
use fleetvisor::{Credential, Fleet, NoNotify};

async fn fleet_with_limit(
    platform: Arc<FakePlatform>,
    dir: &std::path::Path,
    limit: usize,
) -> Fleet {
    let mut config = config_in(dir);
    config.default_limit = limit;
    Fleet::builder(config)
        .build(platform)
        .await
        .expect("fleet builds")
}

#[tokio::test(start_paused = true)]
async fn overflow_spills_to_disk_and_notifies() {
    let dir = tempfile::tempdir().unwrap();
    let platform = FakePlatform::new();
    let mut credentials = Vec::new();
    for i in 0..5 {
        let tok = token(&format!("t{i}"));
        platform.register(&tok, &format!("bot{i}")).await;
        credentials.push(Credential::new(tok));
    }

    let fleet = fleet_with_limit(Arc::clone(&platform), dir.path(), 2).await;
    let notifier = RecordingNotify::default();
    let summary = fleet.launch_batch(credentials, &notifier).await;

    assert_eq!(summary.started, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.overflow, 3);
    assert_eq!(fleet.registry().len().await, 2);

    // First-come order: the first two credentials got the slots.
    assert!(fleet
        .registry()
        .contains(&fleetvisor::Identity::new("bot0"))
        .await);
    assert!(fleet
        .registry()
        .contains(&fleetvisor::Identity::new("bot1"))
        .await);

    // Overflow file holds exactly the spilled credentials, in order.
    let body = tokio::fs::read_to_string(dir.path().join("remaining_tokens.txt"))
        .await
        .unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(
        lines,
        vec![
            token("t2").as_str(),
            token("t3").as_str(),
            token("t4").as_str()
        ]
    );

    // The operator got the file.
    let docs = notifier.documents.lock().await;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].0, dir.path().join("remaining_tokens.txt"));
    assert!(docs[0].1.contains("3 credential(s)"));
}

#[tokio::test(start_paused = true)]
async fn full_fleet_rejects_everything() {
    let dir = tempfile::tempdir().unwrap();
    let platform = FakePlatform::new();
    let first = token("held");
    platform.register(&first, "held_bot").await;
    platform.register(&token("x1"), "x1_bot").await;
    platform.register(&token("x2"), "x2_bot").await;

    let fleet = fleet_with_limit(Arc::clone(&platform), dir.path(), 1).await;
    let summary = fleet
        .launch_batch(vec![Credential::new(first)], &NoNotify)
        .await;
    assert_eq!(summary.started, 1);

    let notifier = RecordingNotify::default();
    let summary = fleet
        .launch_batch(
            vec![
                Credential::new(token("x1")),
                Credential::new(token("x2")),
            ],
            &notifier,
        )
        .await;

    assert_eq!(summary.started, 0);
    assert_eq!(summary.overflow, 2);
    assert_eq!(fleet.registry().len().await, 1);
    let texts = notifier.texts.lock().await;
    assert!(texts.iter().any(|t| t.contains("limit reached")));
}

#[tokio::test(start_paused = true)]
async fn relaunching_a_running_identity_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let platform = FakePlatform::new();
    let tok_a = token("aaa");
    let tok_b = token("bbb");
    // Two distinct credentials resolving to the same identity.
    platform.register(&tok_a, "same_bot").await;
    platform.register(&tok_b, "same_bot").await;

    let fleet = fleet_with_limit(Arc::clone(&platform), dir.path(), 10).await;
    let first = fleet
        .launch_batch(vec![Credential::new(tok_a)], &NoNotify)
        .await;
    assert_eq!(first.started, 1);

    let second = fleet
        .launch_batch(vec![Credential::new(tok_b)], &NoNotify)
        .await;
    assert_eq!(second.started, 0);
    assert_eq!(second.duplicates, 1);
    assert_eq!(second.failed, 0);
    assert_eq!(fleet.registry().len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn resolution_failures_are_counted_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let platform = FakePlatform::new();
    let good = token("good");
    let bad = token("bad1");
    platform.register(&good, "good_bot").await;
    platform.fail_auth(&bad).await;

    let fleet = fleet_with_limit(Arc::clone(&platform), dir.path(), 10).await;
    let summary = fleet
        .launch_batch(
            vec![Credential::new(bad), Credential::new(good)],
            &NoNotify,
        )
        .await;

    assert_eq!(summary.started, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(fleet.registry().len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn transient_conflicts_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let platform = FakePlatform::new();
    let tok = token("busy");
    platform.register(&tok, "busy_bot").await;
    // Two conflicts, then success: within the three-attempt bound.
    platform.fail_conflicts(&tok, 2).await;

    let fleet = fleet_with_limit(Arc::clone(&platform), dir.path(), 10).await;
    let summary = fleet
        .launch_batch(vec![Credential::new(tok)], &NoNotify)
        .await;

    assert_eq!(summary.started, 1);
    assert_eq!(summary.failed, 0);
}

#[tokio::test(start_paused = true)]
async fn sub_batches_pause_between_but_not_after() {
    let dir = tempfile::tempdir().unwrap();
    let platform = FakePlatform::new();
    let mut credentials = Vec::new();
    for i in 0..4 {
        let tok = token(&format!("b{i}"));
        platform.register(&tok, &format!("batch{i}")).await;
        credentials.push(Credential::new(tok));
    }

    let mut config = config_in(dir.path());
    config.default_limit = 10;
    config.batch_size = 2;
    config.batch_delay = Duration::from_secs(10);
    let fleet = Fleet::builder(config)
        .build(Arc::clone(&platform) as Arc<dyn fleetvisor::Platform>)
        .await
        .unwrap();

    let started_at = tokio::time::Instant::now();
    let summary = fleet.launch_batch(credentials, &NoNotify).await;
    let elapsed = started_at.elapsed();

    assert_eq!(summary.started, 4);
    // Two sub-batches: exactly one 10 s pause, none after the last.
    assert_eq!(elapsed, Duration::from_secs(10));
}
