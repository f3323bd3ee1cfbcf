//! tests/common/harness.rs
use coalesce_timer::{Behavior, CoalescingTimer, TimerConfig};
use std::sync::{
    Arc, Mutex, Once,
    atomic::{AtomicUsize, Ordering},
};
use tokio::time::Instant;
use tracing_subscriber::fmt::format::FmtSpan;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "coalesce_timer=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_test_writer()
            .init();
    });
}

/// A stand-in for an externally owned object a timer acts on, such as an
/// open document that needs periodic saving.
#[derive(Debug, Default)]
pub struct Editor {
    saves: AtomicUsize,
    saved_at: Mutex<Vec<Instant>>,
}

impl Editor {
    pub fn save(&self) {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut saved_at) = self.saved_at.lock() {
            saved_at.push(Instant::now());
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn saved_at(&self) -> Vec<Instant> {
        self.saved_at.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

/// A test harness owning an editor and a timer bound to it.
pub struct TestHarness {
    pub editor: Arc<Editor>,
    pub timer: Arc<CoalescingTimer<Editor>>,
}

impl TestHarness {
    pub fn new(behavior: Behavior) -> Self {
        init_tracing();
        let editor = Arc::new(Editor::default());
        let config = TimerConfig::with_behavior(behavior).label("editor.autosave");
        let timer = CoalescingTimer::with_config(&editor, config).unwrap();
        Self {
            editor,
            timer: Arc::new(timer),
        }
    }

    /// Request a save after `delay`.
    pub async fn schedule_save(&self, delay: std::time::Duration) -> coalesce_timer::ArmOutcome {
        self.timer
            .after(delay, |editor: Arc<Editor>| editor.save())
            .await
            .unwrap()
    }
}
