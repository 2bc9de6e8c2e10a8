//! Status polling as a stream.
//!
//! A poll stream is lazy, finite and not restartable: it sleeps one
//! interval, asks the backend for the status, yields it, and ends after the
//! first terminal status or the first error it does not tolerate.

use crate::backend::{Backend, BackendResult};
use cr_protocol::api_models::StatusResponse;
use cr_protocol::process_models::ProcessHandle;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::Stream;
use tracing::warn;

pub type StatusStream = Pin<Box<dyn Stream<Item = BackendResult<StatusResponse>> + Send>>;

/// Poll `handle` every `interval`.
///
/// Up to `error_retries` consecutive poll errors are logged and skipped; the
/// next one is yielded and ends the stream.
pub fn status_stream(
    backend: Arc<dyn Backend>,
    handle: ProcessHandle,
    interval: Duration,
    error_retries: u32,
) -> StatusStream {
    Box::pin(async_stream::stream! {
        let mut consecutive_errors = 0u32;
        loop {
            tokio::time::sleep(interval).await;
            match backend.status(&handle).await {
                Ok(response) => {
                    consecutive_errors = 0;
                    let terminal = response.status.is_terminal();
                    yield Ok(response);
                    if terminal {
                        break;
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors > error_retries {
                        yield Err(e);
                        break;
                    }
                    warn!(
                        process_id = %handle,
                        error = %e,
                        attempt = consecutive_errors,
                        "Status poll failed, retrying"
                    );
                }
            }
        }
    })
}
