//! Shared helpers for globwatch integration tests.

pub mod builders;
pub mod recorder;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use globwatch::logging::{filter_directives, LOG_ENV};
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Upper bound for anything a test awaits.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test-writer subscriber once per test binary.
///
/// Reads the same `GLOBWATCH_LOG` variable as the binary, so
/// `GLOBWATCH_LOG=globwatch=trace cargo test -- --nocapture` shows every
/// throttle decision.
pub fn init_tracing() {
    INIT.call_once(|| {
        let env = std::env::var(LOG_ENV).ok();
        let filter = EnvFilter::try_new(filter_directives(None, env.as_deref()))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, failing the test after [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test timed out after {TEST_TIMEOUT:?}"),
    }
}

/// Let spawned watcher tasks drain their channels without advancing a
/// paused clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub fn patterns(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
