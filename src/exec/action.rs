// src/exec/action.rs

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::errors::Result;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A deferred unit of work started by a task runner.
///
/// The runner owns the cancellation token; the action runs until the token
/// is cancelled or it fails.
pub trait Action: Send {
    fn execute(self: Box<Self>, cancel: CancellationToken) -> BoxFuture<'static, Result<()>>;
}

impl<F, Fut> Action for F
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn execute(self: Box<Self>, cancel: CancellationToken) -> BoxFuture<'static, Result<()>> {
        Box::pin((*self)(cancel))
    }
}

/// Run `action` with a fresh token that is cancelled on Ctrl-C.
pub async fn run_until_ctrl_c(action: Box<dyn Action>) -> Result<()> {
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; shutting down");
            cancel.cancel();
        });
    }

    action.execute(cancel).await
}
