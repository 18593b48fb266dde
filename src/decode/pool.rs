use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::decode::still::{DecodedImage, decode_image};
use crate::foundation::error::{DisplayError, DisplayResult};

/// Decode pool configuration.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DecodePoolOpts {
    /// Worker thread count. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Time a submission may stay unresolved before its frame stops waiting for it.
    pub deadline_ms: u64,
}

impl Default for DecodePoolOpts {
    fn default() -> Self {
        Self {
            threads: None,
            deadline_ms: 2_000,
        }
    }
}

impl DecodePoolOpts {
    /// Deadline as a [`Duration`].
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// One compressed still image waiting to be decoded.
#[derive(Clone, Debug)]
pub struct DecodeRequest {
    /// Compressed payload.
    pub bytes: Arc<[u8]>,
    /// MIME type or bare format name.
    pub format: String,
}

/// Independent decode units backed by a dedicated rayon pool.
///
/// Submissions share nothing: each one builds its own decoder, and its completion callback runs
/// exactly once on the worker that decoded it, in whatever order workers finish.
pub struct DecodePool {
    pool: rayon::ThreadPool,
    submitted: Arc<AtomicU64>,
    completed: Arc<AtomicU64>,
}

impl DecodePool {
    /// Build the worker pool.
    pub fn new(opts: &DecodePoolOpts) -> DisplayResult<Self> {
        Ok(Self {
            pool: build_thread_pool(opts.threads)?,
            submitted: Arc::new(AtomicU64::new(0)),
            completed: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Queue a decode and return immediately.
    ///
    /// `on_done` receives the decoded image or a [`DisplayError::Decode`]; a panicking decoder
    /// is reported as a decode failure rather than taking the worker down.
    pub fn submit<F>(&self, request: DecodeRequest, on_done: F)
    where
        F: FnOnce(DisplayResult<DecodedImage>) + Send + 'static,
    {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let completed = Arc::clone(&self.completed);
        self.pool.spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| {
                decode_image(&request.bytes, &request.format)
            }))
            .unwrap_or_else(|_| Err(DisplayError::decode("decoder panicked")));
            completed.fetch_add(1, Ordering::Relaxed);
            on_done(result);
        });
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Total submissions so far.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Submissions whose callback has started.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for DecodePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodePool")
            .field("threads", &self.threads())
            .field("submitted", &self.submitted())
            .field("completed", &self.completed())
            .finish()
    }
}

fn build_thread_pool(threads: Option<usize>) -> DisplayResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(DisplayError::validation(
            "decode pool 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("rfb-decode-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| DisplayError::Other(anyhow::anyhow!("failed to build decode thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/decode/pool.rs"]
mod tests;
