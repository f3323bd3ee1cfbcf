//! 合并定时器集成测试
//! Coalescing timer integration tests

pub mod common;

use coalesce_timer::{ArmOutcome, Behavior};
use common::harness::{Editor, TestHarness};
use std::sync::Arc;
use tokio::time::{Duration, Instant, sleep};

#[tokio::test(start_paused = true)]
async fn test_autosave_debounces_bursts_of_edits() {
    let harness = TestHarness::new(Behavior::Delay);
    let start = Instant::now();

    // 每 200ms 一次编辑，持续 2 秒；只有最后一次编辑后的 1 秒才保存
    // An edit every 200ms for 2 seconds; only 1s after the last edit saves
    for _ in 0..10 {
        harness.schedule_save(Duration::from_secs(1)).await;
        sleep(Duration::from_millis(200)).await;
    }
    assert_eq!(harness.editor.saves(), 0);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(harness.editor.saves(), 1);

    let saved_at = harness.editor.saved_at();
    let elapsed = saved_at[0].duration_since(start);
    // 最后一次编辑发生在 1.8s
    // The last edit happened at 1.8s
    assert!(elapsed >= Duration::from_millis(2800), "saved too early: {:?}", elapsed);
    assert!(elapsed <= Duration::from_millis(2820), "saved too late: {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_coalesces_to_first_deadline() {
    let harness = TestHarness::new(Behavior::Coalesce);
    let start = Instant::now();

    let first = harness.schedule_save(Duration::from_millis(500)).await;
    assert!(matches!(first, ArmOutcome::Armed { .. }));
    for _ in 0..4 {
        sleep(Duration::from_millis(100)).await;
        assert_eq!(
            harness.schedule_save(Duration::from_millis(500)).await,
            ArmOutcome::Dropped
        );
    }

    sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.editor.saves(), 1);
    let elapsed = harness.editor.saved_at()[0].duration_since(start);
    assert!(elapsed >= Duration::from_millis(500) && elapsed <= Duration::from_millis(520));
}

#[tokio::test(start_paused = true)]
async fn test_closed_editor_is_never_saved() {
    let TestHarness { editor, timer } = TestHarness::new(Behavior::Coalesce);
    let observer = Arc::downgrade(&editor);

    timer
        .after(Duration::from_secs(1), |editor: Arc<Editor>| editor.save())
        .await
        .unwrap();
    drop(editor);

    sleep(Duration::from_secs(2)).await;
    assert!(observer.upgrade().is_none());

    let stats = timer.stats().await.unwrap();
    assert_eq!(stats.fired, 0);
    assert_eq!(stats.skipped, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_threads_share_one_timer() {
    let harness = TestHarness::new(Behavior::Coalesce);

    let mut tasks = Vec::new();
    for i in 0..16u64 {
        let timer = harness.timer.clone();
        tasks.push(tokio::spawn(async move {
            timer
                .after(Duration::from_millis(100 + i * 10), |editor: Arc<Editor>| editor.save())
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    sleep(Duration::from_millis(600)).await;
    assert_eq!(harness.editor.saves(), 1);

    let stats = harness.timer.stats().await.unwrap();
    assert_eq!(stats.armed, 1);
    assert_eq!(stats.armed + stats.rearmed + stats.dropped, 16);
    assert_eq!(stats.fired, 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_then_rearm() {
    let harness = TestHarness::new(Behavior::Delay);

    harness.schedule_save(Duration::from_secs(1)).await;
    assert!(harness.timer.cancel().await.unwrap());
    sleep(Duration::from_secs(2)).await;
    assert_eq!(harness.editor.saves(), 0);

    let outcome = harness.schedule_save(Duration::from_secs(1)).await;
    assert!(matches!(outcome, ArmOutcome::Armed { .. }));
    sleep(Duration::from_secs(2)).await;
    assert_eq!(harness.editor.saves(), 1);
}
