use crate::downstream::DownstreamClient;
use crate::error::ProxyError;
use crate::item::{Customer, Item, MAX_BATCH};
use crate::queue::QueueSet;
use crate::strategy::{Strategy, StrategyRegister, pack_fcfs, select_fair, select_sjf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};

/// Front door shared with ingress handlers: enqueues a request under
/// whichever strategy is active at the moment of the call, then
/// suspends until the dispatcher resolves it.
pub struct Dispatch {
    queues: Arc<Mutex<QueueSet>>,
    strategy: Arc<StrategyRegister>,
    next_id: AtomicU64,
}

impl Dispatch {
    pub fn new(queues: Arc<Mutex<QueueSet>>, strategy: Arc<StrategyRegister>) -> Self {
        Self {
            queues,
            strategy,
            next_id: AtomicU64::new(0),
        }
    }

    pub async fn request(&self, customer: Customer, sequences: Vec<String>) -> Result<(Vec<String>, i64), ProxyError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let mut item = Item::new(id, customer, sequences);
        item.completion = Some(tx);
        let arrived_at = item.arrived_at;

        {
            let mut qs = self.queues.lock().await;
            if self.strategy.get() == Strategy::Fair {
                qs.enqueue_fair(item);
            } else {
                qs.enqueue_fifo(item);
            }
        }

        let results = rx.await.map_err(ProxyError::Dispatch)??;
        Ok((results, Item::latency_ms(arrived_at)))
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy.get()
    }

    pub fn set_strategy(&self, s: Strategy) {
        self.strategy.set(s);
    }
}

/// The single long-running worker: builds one batch per cycle under
/// the active strategy, issues one downstream call, and demultiplexes
/// labels back to the items' completion handles.
pub struct Dispatcher {
    queues: Arc<Mutex<QueueSet>>,
    strategy: Arc<StrategyRegister>,
    downstream: Arc<DownstreamClient>,
    idle_poll: Duration,
    batch_timeout: Duration,
    shutdown: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(
        queues: Arc<Mutex<QueueSet>>,
        strategy: Arc<StrategyRegister>,
        downstream: Arc<DownstreamClient>,
        idle_poll: Duration,
        batch_timeout: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            queues,
            strategy,
            downstream,
            idle_poll,
            batch_timeout,
            shutdown,
        }
    }

    /// Spawns the dispatcher loop. Mirrors the teacher's `Batcher::run`:
    /// consume `self` into the task, surviving the caller's scope.
    pub fn run(self) {
        tokio::spawn(async move {
            self.run_loop().await;
            tracing::info!("dispatcher exiting");
        });
    }

    async fn run_loop(self) {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                self.drain_on_shutdown().await;
                return;
            }

            let batch = self.select_batch().await;
            if batch.is_empty() {
                tokio::time::sleep(self.idle_poll).await;
                continue;
            }

            self.process_batch(batch).await;
        }
    }

    async fn select_batch(&self) -> Vec<Item> {
        match self.strategy.get() {
            Strategy::Fcfs => self.select_fcfs_with_topup().await,
            other => {
                let mut qs = self.queues.lock().await;
                if qs.is_empty() {
                    return Vec::new();
                }
                match other {
                    Strategy::Sjf => select_sjf(&mut qs),
                    Strategy::Fair => select_fair(&mut qs),
                    Strategy::Fcfs => unreachable!(),
                }
            }
        }
    }

    /// FCFS packs heads-that-fit, and if it formed a non-empty,
    /// non-full batch, waits `batch_timeout` once and tops up. The
    /// wait is skipped entirely when nothing was admitted or the
    /// first pass already filled the batch.
    async fn select_fcfs_with_topup(&self) -> Vec<Item> {
        let mut batch = Vec::new();
        let mut total = 0usize;

        {
            let mut qs = self.queues.lock().await;
            pack_fcfs(&mut qs, &mut batch, &mut total);
        }

        if !batch.is_empty() && total < MAX_BATCH {
            tokio::time::sleep(self.batch_timeout).await;
            let mut qs = self.queues.lock().await;
            pack_fcfs(&mut qs, &mut batch, &mut total);
        }

        batch
    }

    async fn process_batch(&self, mut batch: Vec<Item>) {
        let mut flat: Vec<String> = Vec::new();
        let mut idx_map: Vec<(usize, usize)> = Vec::new();
        for (item_idx, item) in batch.iter().enumerate() {
            for (pos, seq) in item.sequences.iter().enumerate() {
                flat.push(seq.clone());
                idx_map.push((item_idx, pos));
            }
        }

        match self.downstream.classify(&flat).await {
            Ok(labels) => {
                let mut buffers: Vec<Vec<Option<String>>> = batch.iter().map(|it| vec![None; it.seq_count()]).collect();
                for ((item_idx, pos), label) in idx_map.into_iter().zip(labels) {
                    buffers[item_idx][pos] = Some(label);
                }

                let item_count = batch.len();
                for (item, buf) in batch.iter_mut().zip(buffers.into_iter()) {
                    if buf.iter().all(Option::is_some) {
                        let results = buf.into_iter().map(Option::unwrap).collect();
                        item.resolve(Ok(results));
                    } else {
                        item.resolve(Err(ProxyError::Truncated));
                    }
                }
                tracing::info!(batch = %item_count, "batch_ok");
            }
            Err(e) => {
                let item_count = batch.len();
                for item in batch.iter_mut() {
                    item.resolve(Err(e.clone()));
                }
                tracing::error!(error = %e, batch = %item_count, "batch_err");
            }
        }
    }

    async fn drain_on_shutdown(&self) {
        let mut qs = self.queues.lock().await;
        let stranded: Vec<Item> = qs.fifo.drain(..).chain(qs.q_a.drain(..)).chain(qs.q_b.drain(..)).collect();
        drop(qs);

        for mut item in stranded {
            item.resolve(Err(ProxyError::ShuttingDown));
        }
    }
}
