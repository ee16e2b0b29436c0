//! The runner: spawns this process's worker loops and reconciler, and
//! shuts them down together.

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use crate::dispatch::reconciler::Reconciler;
use crate::dispatch::worker::Worker;
use crate::state::WorkerContext;

/// Spawns `dispatch.worker_loops` worker loops plus one reconciler loop.
pub struct Runner {
    context: WorkerContext,
}

impl Runner {
    pub fn new(context: WorkerContext) -> Self {
        Self { context }
    }

    /// Start the dispatch loops.
    ///
    /// Returns a [`RunHandle`] used to request shutdown and wait for it.
    pub fn start(&self) -> RunHandle {
        let cancel = CancellationToken::new();
        let mut handles = Vec::new();
        let config = self.context.settings.dispatch.clone();

        for i in 0..config.worker_loops {
            let worker = Worker {
                repos: self.context.repos.clone(),
                senders: self.context.senders.clone(),
                config: config.clone(),
                worker_id: self.context.loop_worker_id(i),
            };
            let name = worker.worker_id.clone();
            info!(worker.name = %name, "Starting worker loop…");

            let span = info_span!("worker", worker.name = %name);
            let token = cancel.clone();
            let handle = tokio::spawn(async move { worker.run(token).instrument(span).await });
            handles.push(handle);
        }

        let reconciler = Reconciler {
            repos: self.context.repos.clone(),
            config,
        };
        let span = info_span!("reconciler");
        let token = cancel.clone();
        info!("Starting reconciler loop…");
        handles.push(tokio::spawn(async move {
            reconciler.run(token).instrument(span).await
        }));

        RunHandle { handles, cancel }
    }
}

/// Handle to the running dispatch loops.
pub struct RunHandle {
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl RunHandle {
    /// Request cooperative shutdown of every loop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for all loops to finish.
    pub async fn wait_for_shutdown(self) {
        join_all(self.handles).await.into_iter().for_each(|result| {
            if let Err(error) = result {
                warn!(%error, "Dispatch loop task panicked");
            }
        });
    }
}
