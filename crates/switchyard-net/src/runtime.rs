//! Process-wide runtime behind the `*_blocking` calls.

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::{NetworkError, Result};

static SHARED: OnceLock<Runtime> = OnceLock::new();

fn shared() -> Result<&'static Runtime> {
    if let Some(runtime) = SHARED.get() {
        return Ok(runtime);
    }
    let runtime = Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("switchyard-blocking")
        .enable_all()
        .build()
        .map_err(|e| NetworkError::Request(format!("cannot start runtime: {e}")))?;
    // A racing caller may have won; its runtime is kept and ours dropped.
    let _ = SHARED.set(runtime);
    SHARED
        .get()
        .ok_or_else(|| NetworkError::Request("runtime unavailable".into()))
}

/// Run `future` to completion from synchronous code.
///
/// Fails instead of panicking when called from inside a tokio runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    if Handle::try_current().is_ok() {
        return Err(NetworkError::InvalidArgument(
            "blocking call made from inside an async runtime; use the async variant".into(),
        ));
    }
    Ok(shared()?.block_on(future))
}
