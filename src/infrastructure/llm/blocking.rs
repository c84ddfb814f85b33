//! Blocking wrappers over the async client
//!
//! Blocking calls drive the async code on one lazily built, process-wide runtime with a
//! single worker thread. The worker keeps pooled connections alive between calls.

use std::future::Future;

use futures::StreamExt;
use once_cell::sync::OnceCell;
use tokio::runtime::{Builder, Handle, Runtime};

use crate::domain::llm::{LlmStream, StreamChunk};
use crate::domain::LlmError;

static RUNTIME: OnceCell<Runtime> = OnceCell::new();

fn runtime() -> Result<&'static Runtime, LlmError> {
    RUNTIME.get_or_try_init(|| {
        Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("agentine-blocking")
            .enable_all()
            .build()
            .map_err(|e| LlmError::configuration(format!("Failed to start runtime: {}", e)))
    })
}

/// Run `future` to completion on the blocking runtime.
///
/// Fails instead of panicking when called from inside an async runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, LlmError> {
    if Handle::try_current().is_ok() {
        return Err(LlmError::configuration(
            "Blocking call made from inside an async runtime; use the async variant instead",
        ));
    }

    Ok(runtime()?.block_on(future))
}

/// Blocking iterator over a streamed reply.
///
/// Single-pass: after the last chunk or the first error it yields `None`. Dropping it closes
/// the connection.
pub struct ChunkIter {
    stream: LlmStream,
    done: bool,
}

impl ChunkIter {
    pub(crate) fn new(stream: LlmStream) -> Self {
        Self {
            stream,
            done: false,
        }
    }
}

impl std::fmt::Debug for ChunkIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkIter").field("done", &self.done).finish()
    }
}

impl Iterator for ChunkIter {
    type Item = Result<StreamChunk, LlmError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match block_on(self.stream.next()) {
            Ok(Some(Ok(chunk))) => Some(Ok(chunk)),
            Ok(Some(Err(e))) | Err(e) => {
                self.done = true;
                Some(Err(e))
            }
            Ok(None) => {
                self.done = true;
                None
            }
        }
    }
}
