//! Event bus (C3, spec §4.3, §5).
//!
//! Handlers never run inline with the transaction that raised their event:
//! the unit of work collects events and only the caller's post-commit call
//! to [`EventBus::dispatch`] fans them out. Sync handlers run in
//! registration order on the calling task; async handlers are hated off to
//! a fixed worker pool over a bounded channel so a slow subscriber can't
//! grow memory without bound. Critical events (KPI threshold violations,
//! tenant bypass) use a bounded blocking send instead of `try_send` so they
//! are never silently dropped under backpressure.

use crate::domain::DomainEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[async_trait]
pub trait SyncEventHandler: Send + Sync {
    fn handle(&self, event: &DomainEvent);
}

#[async_trait]
pub trait AsyncEventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

struct Worker {
    handlers: Arc<Vec<Arc<dyn AsyncEventHandler>>>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<DomainEvent>) {
        while let Some(event) = rx.recv().await {
            for handler in self.handlers.iter() {
                handler.handle(&event).await;
            }
        }
    }
}

/// Owns the sync handler list and the channel feeding the async worker
/// pool. Cloning an `EventBus` shares the same channel and workers.
#[derive(Clone)]
pub struct EventBus {
    sync_handlers: Arc<Vec<Arc<dyn SyncEventHandler>>>,
    tx: mpsc::Sender<DomainEvent>,
    critical_timeout: std::time::Duration,
}

pub struct EventBusBuilder {
    sync_handlers: Vec<Arc<dyn SyncEventHandler>>,
    async_handlers: Vec<Arc<dyn AsyncEventHandler>>,
    worker_pool_size: usize,
    queue_size: usize,
}

impl EventBusBuilder {
    pub fn new(worker_pool_size: usize, queue_size: usize) -> Self {
        Self {
            sync_handlers: Vec::new(),
            async_handlers: Vec::new(),
            worker_pool_size: worker_pool_size.max(1),
            queue_size: queue_size.max(1),
        }
    }

    pub fn with_sync_handler(mut self, handler: Arc<dyn SyncEventHandler>) -> Self {
        self.sync_handlers.push(handler);
        self
    }

    pub fn with_async_handler(mut self, handler: Arc<dyn AsyncEventHandler>) -> Self {
        self.async_handlers.push(handler);
        self
    }

    /// Spawns the fixed worker pool and returns the bus plus join handles
    /// the caller keeps for graceful shutdown.
    pub fn build(self) -> (EventBus, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel(self.queue_size);
        let handlers = Arc::new(self.async_handlers);
        let mut join_handles = Vec::with_capacity(self.worker_pool_size);

        if self.worker_pool_size == 1 {
            let worker = Worker {
                handlers: handlers.clone(),
            };
            join_handles.push(tokio::spawn(worker.run(rx)));
        } else {
            // Fan multiple queues out of one channel isn't possible with mpsc
            // alone, so route through a shared receiver guarded by a mutex —
            // each worker polls it, preserving at-least-one-consumer semantics
            // without unbounded fan-out.
            let shared_rx = Arc::new(tokio::sync::Mutex::new(rx));
            for _ in 0..self.worker_pool_size {
                let handlers = handlers.clone();
                let shared_rx = shared_rx.clone();
                join_handles.push(tokio::spawn(async move {
                    loop {
                        let event = {
                            let mut guard = shared_rx.lock().await;
                            guard.recv().await
                        };
                        match event {
                            Some(event) => {
                                for handler in handlers.iter() {
                                    handler.handle(&event).await;
                                }
                            }
                            None => break,
                        }
                    }
                }));
            }
        }

        (
            EventBus {
                sync_handlers: Arc::new(self.sync_handlers),
                tx,
                critical_timeout: std::time::Duration::from_secs(5),
            },
            join_handles,
        )
    }
}

impl EventBus {
    /// Runs sync handlers inline (registration order), then enqueues every
    /// event for async dispatch. Called once, after a unit of work commits.
    pub async fn dispatch(&self, events: Vec<DomainEvent>) {
        for event in events {
            for handler in self.sync_handlers.iter() {
                handler.handle(&event);
            }
            self.enqueue(event).await;
        }
    }

    async fn enqueue(&self, event: DomainEvent) {
        if event.critical {
            if tokio::time::timeout(self.critical_timeout, self.tx.send(event.clone()))
                .await
                .is_err()
            {
                tracing::error!(
                    event_type = %event.event_type,
                    aggregate_id = %event.aggregate_id,
                    "critical event dispatch timed out; handlers backed up"
                );
            }
            return;
        }
        if self.tx.try_send(event.clone()).is_err() {
            tracing::warn!(
                event_type = %event.event_type,
                aggregate_id = %event.aggregate_id,
                "event queue full, dropping non-critical event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSync(Arc<AtomicUsize>);
    impl SyncEventHandler for CountingSync {
        fn handle(&self, _event: &DomainEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct CountingAsync(Arc<AtomicUsize>);
    #[async_trait]
    impl AsyncEventHandler for CountingAsync {
        async fn handle(&self, _event: &DomainEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn dispatch_runs_sync_then_fans_out_async() {
        let sync_count = Arc::new(AtomicUsize::new(0));
        let async_count = Arc::new(AtomicUsize::new(0));
        let (bus, _handles) = EventBusBuilder::new(2, 16)
            .with_sync_handler(Arc::new(CountingSync(sync_count.clone())))
            .with_async_handler(Arc::new(CountingAsync(async_count.clone())))
            .build();

        let event = EventKind::HoldCreated {
            hold_id: "h1".into(),
        }
        .into_event(Some("c1".into()), Some("u1".into()));

        bus.dispatch(vec![event]).await;
        assert_eq!(sync_count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(async_count.load(Ordering::SeqCst), 1);
    }
}
