//! Fire-and-forget submission of hydration runs.
//!
//! The trigger surface enqueues a job and returns immediately; the outcome
//! is observed through the handle row's status, never through the submission
//! call. Jobs run one at a time on a dedicated task — the compare-and-swap
//! in the orchestrator already rejects concurrent runs for one handle, and
//! sequential execution keeps the remote traffic polite.

use ember_core::{
  registry::CollectionRegistry,
  remote::{IdentityResolver, RepoHost},
  store::HandleStore,
};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{Error, Result, run::hydrate};

const QUEUE_CAPACITY: usize = 64;

/// One scheduled hydration run.
#[derive(Debug, Clone, Copy)]
pub struct HydrationJob {
  pub handle_id: Uuid,
  pub delta:     bool,
}

/// Handle to the background hydration worker. Cheap to clone.
#[derive(Clone)]
pub struct Hydrator {
  tx: mpsc::Sender<HydrationJob>,
}

impl Hydrator {
  /// Spawn the worker task and return a submission handle.
  pub fn spawn<S, I, R>(
    store: S,
    resolver: I,
    repo: R,
    registry: CollectionRegistry,
  ) -> Self
  where
    S: HandleStore + Clone + 'static,
    I: IdentityResolver + 'static,
    R: RepoHost + 'static,
  {
    let (tx, mut rx) = mpsc::channel::<HydrationJob>(QUEUE_CAPACITY);

    tokio::spawn(async move {
      while let Some(job) = rx.recv().await {
        // Failures are already recorded on the handle row by the
        // orchestrator; nothing to do with the result here.
        let _ = hydrate(
          &store,
          &resolver,
          &repo,
          &registry,
          job.handle_id,
          job.delta,
        )
        .await;
      }
      tracing::info!("hydration worker stopped");
    });

    Self { tx }
  }

  /// Wrap an existing submission channel. The caller owns the receiving
  /// side and decides how (or whether) jobs get drained.
  pub fn from_sender(tx: mpsc::Sender<HydrationJob>) -> Self {
    Self { tx }
  }

  /// Enqueue a run. Returns as soon as the job is accepted; the caller gets
  /// no outcome beyond the acknowledgment.
  ///
  /// On a submission failure the caller must record `error` status on the
  /// handle row itself — see [`Error::Submission`].
  pub fn submit(&self, job: HydrationJob) -> Result<()> {
    self
      .tx
      .try_send(job)
      .map_err(|e| Error::Submission(e.to_string()))
  }
}
