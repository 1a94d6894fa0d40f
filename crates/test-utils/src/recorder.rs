use std::sync::{Arc, Mutex};

use globwatch::errors::Result;
use tokio_util::sync::CancellationToken;

/// Records every group callback invocation.
///
/// Clone it into a `watch_groups` callback with [`CallRecorder::callback`],
/// then inspect the calls from the test.
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> impl Fn(&CancellationToken, &str) -> Result<()> + Send + Sync + 'static {
        let calls = Arc::clone(&self.calls);
        move |_cancel: &CancellationToken, group: &str| {
            calls.lock().unwrap().push(group.to_string());
            Ok(())
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, group: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|g| *g == group).count()
    }

    pub fn total(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}
