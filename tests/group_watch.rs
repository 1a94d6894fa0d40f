use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use globwatch::exec::Action;
use globwatch::fs::mock::MockFileSystem;
use globwatch::watch::{FsGlobResolver, MockSubscriber, Watcher};
use globwatch::{ChangeOp, WatchError};
use globwatch_test_utils::builders::GroupTableBuilder;
use globwatch_test_utils::recorder::CallRecorder;
use globwatch_test_utils::{init_tracing, settle, with_timeout};
use tokio::time::advance;
use tokio_util::sync::CancellationToken;

type TestResult = Result<(), Box<dyn Error>>;

fn project() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("a/one.txt", "1");
    fs.add_file("a/two.txt", "2");
    fs.add_file("b/three.txt", "3");
    fs.add_file("c/four.txt", "4");
    fs.add_file("main.go", "package main");
    fs
}

fn watcher(fs: &MockFileSystem, subscriber: &MockSubscriber) -> Watcher {
    Watcher::new(
        Arc::new(FsGlobResolver::new(Arc::new(fs.clone()))),
        Arc::new(subscriber.clone()),
    )
}

#[tokio::test(start_paused = true)]
async fn building_a_group_watch_starts_nothing() {
    let fs = project();
    let subscriber = MockSubscriber::new();
    let recorder = CallRecorder::new();

    let groups = watcher(&fs, &subscriber).watch_groups(
        recorder.callback(),
        GroupTableBuilder::new().group("a", &["a/*.txt"]).build(),
    );

    settle().await;
    assert_eq!(groups.groups().collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(subscriber.subscription_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn one_watcher_per_group() -> TestResult {
    init_tracing();
    let fs = project();
    let subscriber = MockSubscriber::new();
    let recorder = CallRecorder::new();
    let cancel = CancellationToken::new();

    let table = GroupTableBuilder::new()
        .group("a", &["a/*.txt"])
        .group("b", &["b/*.txt"])
        .group("c", &["c/*.txt"])
        .build();
    let groups = watcher(&fs, &subscriber).watch_groups(recorder.callback(), table);
    let running = tokio::spawn(groups.run(cancel.clone()));
    settle().await;

    assert_eq!(subscriber.subscription_count(), 3);
    assert_eq!(subscriber.open_count(), 3);

    cancel.cancel();
    with_timeout(running).await??;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn change_only_triggers_its_own_group() -> TestResult {
    init_tracing();
    let fs = project();
    let subscriber = MockSubscriber::new();
    let recorder = CallRecorder::new();
    let cancel = CancellationToken::new();

    let table = GroupTableBuilder::new()
        .group("a", &["a/*.txt"])
        .group("b", &["b/*.txt"])
        .build();
    let running = tokio::spawn(
        watcher(&fs, &subscriber)
            .watch_groups(recorder.callback(), table)
            .run(cancel.clone()),
    );
    settle().await;

    subscriber.emit("a/one.txt", ChangeOp::Write);
    settle().await;

    assert_eq!(recorder.calls(), vec!["a".to_string()]);

    cancel.cancel();
    with_timeout(running).await??;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn throttles_are_per_group() -> TestResult {
    let fs = project();
    let subscriber = MockSubscriber::new();
    let recorder = CallRecorder::new();
    let cancel = CancellationToken::new();

    let table = GroupTableBuilder::new()
        .group("a", &["a/*.txt"])
        .group("b", &["b/*.txt"])
        .build();
    let running = tokio::spawn(
        watcher(&fs, &subscriber)
            .watch_groups(recorder.callback(), table)
            .run(cancel.clone()),
    );
    settle().await;

    // Burst on both groups inside one window.
    subscriber.emit("a/one.txt", ChangeOp::Write);
    subscriber.emit("b/three.txt", ChangeOp::Write);
    subscriber.emit("a/two.txt", ChangeOp::Write);
    settle().await;
    advance(Duration::from_millis(20)).await;
    subscriber.emit("b/three.txt", ChangeOp::Write);
    settle().await;

    assert_eq!(recorder.count("a"), 1);
    assert_eq!(recorder.count("b"), 1);

    advance(Duration::from_millis(100)).await;
    subscriber.emit("b/three.txt", ChangeOp::Write);
    settle().await;

    assert_eq!(recorder.count("a"), 1);
    assert_eq!(recorder.count("b"), 2);
    assert_eq!(recorder.total(), 3);

    cancel.cancel();
    with_timeout(running).await??;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn build_scenario_three_quick_writes_then_one_later() -> TestResult {
    let fs = project();
    let subscriber = MockSubscriber::new();
    let recorder = CallRecorder::new();
    let cancel = CancellationToken::new();

    let running = tokio::spawn(
        watcher(&fs, &subscriber)
            .watch_groups(
                recorder.callback(),
                GroupTableBuilder::new().group("build", &["*.go"]).build(),
            )
            .run(cancel.clone()),
    );
    settle().await;

    for gap in [0, 10, 30] {
        advance(Duration::from_millis(gap)).await;
        subscriber.emit("main.go", ChangeOp::Write);
        settle().await;
    }
    assert_eq!(recorder.calls(), vec!["build".to_string()]);

    advance(Duration::from_millis(80)).await;
    subscriber.emit("main.go", ChangeOp::Write);
    settle().await;
    assert_eq!(recorder.calls(), vec!["build".to_string(), "build".to_string()]);

    cancel.cancel();
    with_timeout(running).await??;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn callback_receives_the_callers_token() -> TestResult {
    let fs = project();
    let subscriber = MockSubscriber::new();
    let cancel = CancellationToken::new();
    let seen_cancelled = Arc::new(Mutex::new(Vec::new()));

    let callback = {
        let seen = Arc::clone(&seen_cancelled);
        move |token: &CancellationToken, group: &str| -> Result<(), WatchError> {
            seen.lock().unwrap().push((group.to_string(), token.is_cancelled()));
            // Cancelling through the token handed to the callback stops
            // everything.
            token.cancel();
            Ok(())
        }
    };

    let running = tokio::spawn(
        watcher(&fs, &subscriber)
            .watch_groups(callback, GroupTableBuilder::new().group("a", &["a/*.txt"]).build())
            .run(cancel.clone()),
    );
    settle().await;

    subscriber.emit("a/one.txt", ChangeOp::Write);
    with_timeout(running).await??;

    assert!(cancel.is_cancelled());
    assert_eq!(
        *seen_cancelled.lock().unwrap(),
        vec![("a".to_string(), false)]
    );
    assert_eq!(subscriber.open_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn callback_errors_do_not_stop_the_group() -> TestResult {
    init_tracing();
    let fs = project();
    let subscriber = MockSubscriber::new();
    let cancel = CancellationToken::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let callback = {
        let calls = Arc::clone(&calls);
        move |_: &CancellationToken, group: &str| -> Result<(), WatchError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(WatchError::Config(format!("no command for {group}")))
        }
    };

    let running = tokio::spawn(
        watcher(&fs, &subscriber)
            .watch_groups(callback, GroupTableBuilder::new().group("a", &["a/*.txt"]).build())
            .run(cancel.clone()),
    );
    settle().await;

    subscriber.emit("a/one.txt", ChangeOp::Write);
    settle().await;
    advance(Duration::from_millis(60)).await;
    subscriber.emit("a/one.txt", ChangeOp::Write);
    settle().await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!running.is_finished());

    cancel.cancel();
    with_timeout(running).await??;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_every_subscription_before_returning() -> TestResult {
    let fs = project();
    let subscriber = MockSubscriber::new();
    let recorder = CallRecorder::new();
    let cancel = CancellationToken::new();

    let table = GroupTableBuilder::new()
        .group("a", &["a/*.txt"])
        .group("b", &["b/*.txt"])
        .group("c", &["c/*.txt"])
        .build();
    let running = tokio::spawn(
        watcher(&fs, &subscriber)
            .watch_groups(recorder.callback(), table)
            .run(cancel.clone()),
    );
    settle().await;
    assert!(!running.is_finished());

    cancel.cancel();
    with_timeout(running).await??;

    assert_eq!(subscriber.open_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_group_stops_already_started_groups() {
    init_tracing();
    let fs = project();
    let subscriber = MockSubscriber::new();
    subscriber.fail_on_add("b/three.txt");
    let recorder = CallRecorder::new();
    let cancel = CancellationToken::new();

    let table = GroupTableBuilder::new()
        .group("a", &["a/*.txt"])
        .group("b", &["b/*.txt"])
        .group("c", &["c/*.txt"])
        .build();
    let result = with_timeout(
        watcher(&fs, &subscriber)
            .watch_groups(recorder.callback(), table)
            .run(cancel.clone()),
    )
    .await;

    match result {
        Err(WatchError::Register { path, .. }) => {
            assert_eq!(path, std::path::PathBuf::from("b/three.txt"))
        }
        other => panic!("expected Register error, got {other:?}"),
    }

    // "a" was started and then torn down, "c" was never started.
    assert_eq!(subscriber.subscription_count(), 2);
    assert_eq!(subscriber.open_count(), 0);
    assert!(!cancel.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn runs_through_the_action_seam() -> TestResult {
    let fs = project();
    let subscriber = MockSubscriber::new();
    let recorder = CallRecorder::new();
    let cancel = CancellationToken::new();

    let action: Box<dyn Action> = Box::new(
        watcher(&fs, &subscriber)
            .watch_groups(recorder.callback(), GroupTableBuilder::new().group("a", &["a/*.txt"]).build()),
    );
    let running = tokio::spawn(action.execute(cancel.clone()));
    settle().await;

    subscriber.emit("a/two.txt", ChangeOp::Create);
    settle().await;
    assert_eq!(recorder.calls(), vec!["a".to_string()]);

    cancel.cancel();
    with_timeout(running).await??;
    Ok(())
}
