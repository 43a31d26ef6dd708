//! 点击记录器
//!
//! 重定向热路径与持久化之间的隔离层：
//! - `record()` 非阻塞（有界队列，满则丢弃最新事件并计数）
//! - 后台任务按间隔或批量阈值刷盘
//! - 刷盘失败时批量保留重试，上限之外丢弃
//! - 关闭时限时尽力排空，不保证不丢

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, trace, warn};

use super::{ClickEvent, ClickSink};
use crate::config::ClicksConfig;

/// 刷盘失败时批量缓冲的上限倍数，超过后丢弃最旧事件
const MAX_PENDING_FACTOR: usize = 4;

pub struct ClickRecorder {
    tx: mpsc::Sender<ClickEvent>,
    dropped: Arc<AtomicU64>,
    flushed: Arc<AtomicU64>,
    shutdown: Arc<Notify>,
    consumer: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ClickRecorder {
    /// Create the recorder and spawn its consumer task on the current
    /// runtime.
    pub fn spawn(sink: Arc<dyn ClickSink>, config: &ClicksConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        let flushed = Arc::new(AtomicU64::new(0));
        let shutdown = Arc::new(Notify::new());

        let consumer = tokio::spawn(consumer_loop(
            rx,
            sink,
            Duration::from_secs(config.flush_interval_secs.max(1)),
            config.flush_batch_size,
            Arc::clone(&dropped),
            Arc::clone(&flushed),
            Arc::clone(&shutdown),
        ));

        Self {
            tx,
            dropped,
            flushed,
            shutdown,
            consumer: tokio::sync::Mutex::new(Some(consumer)),
        }
    }

    /// Enqueue one event. Never blocks and never fails the caller: when the
    /// queue is full the event is dropped (newest-loses policy) and counted.
    pub fn record(&self, event: ClickEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if total.is_power_of_two() {
                    warn!("ClickRecorder: queue full, {} events dropped so far", total);
                }
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!("ClickRecorder: consumer stopped, event discarded");
            }
        }
    }

    /// Events dropped due to overflow or recorder shutdown.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Events durably handed to the sink.
    pub fn flushed_count(&self) -> u64 {
        self.flushed.load(Ordering::Relaxed)
    }

    /// Best-effort final drain bounded by `timeout`. Events still queued
    /// when the budget runs out are lost; that loss is documented and
    /// accepted.
    pub async fn shutdown(&self, timeout: Duration) {
        self.shutdown.notify_one();

        let handle = self.consumer.lock().await.take();
        if let Some(handle) = handle {
            match tokio::time::timeout(timeout, handle).await {
                Ok(_) => debug!("ClickRecorder: final drain completed"),
                Err(_) => warn!(
                    "ClickRecorder: shutdown drain exceeded {:?}, queued events lost",
                    timeout
                ),
            }
        }
    }
}

async fn consumer_loop(
    mut rx: mpsc::Receiver<ClickEvent>,
    sink: Arc<dyn ClickSink>,
    flush_interval: Duration,
    batch_size: usize,
    dropped: Arc<AtomicU64>,
    flushed: Arc<AtomicU64>,
    shutdown: Arc<Notify>,
) {
    let mut batch: Vec<ClickEvent> = Vec::with_capacity(batch_size);
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval 的首次 tick 立即完成，跳过
    ticker.tick().await;

    loop {
        tokio::select! {
            maybe_event = rx.recv() => match maybe_event {
                Some(event) => {
                    batch.push(event);
                    if batch.len() >= batch_size {
                        flush_batch(&sink, &mut batch, &dropped, &flushed, batch_size).await;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                flush_batch(&sink, &mut batch, &dropped, &flushed, batch_size).await;
            }
            _ = shutdown.notified() => {
                // 只取当前已排队的事件，不再等待新事件
                while let Ok(event) = rx.try_recv() {
                    batch.push(event);
                }
                break;
            }
        }
    }

    flush_batch(&sink, &mut batch, &dropped, &flushed, batch_size).await;
    debug!("ClickRecorder: consumer task exited");
}

async fn flush_batch(
    sink: &Arc<dyn ClickSink>,
    batch: &mut Vec<ClickEvent>,
    dropped: &AtomicU64,
    flushed: &AtomicU64,
    batch_size: usize,
) {
    if batch.is_empty() {
        return;
    }

    let count = batch.len();
    match sink.flush_events(batch.clone()).await {
        Ok(()) => {
            flushed.fetch_add(count as u64, Ordering::Relaxed);
            trace!("ClickRecorder: flushed {} events", count);
            batch.clear();
        }
        Err(e) => {
            // 保留批量等待下次刷盘；超过上限则丢弃最旧的部分
            warn!("ClickRecorder: flush failed ({}), retrying on next flush", e);
            let max_pending = batch_size.saturating_mul(MAX_PENDING_FACTOR).max(1);
            if batch.len() > max_pending {
                let overflow = batch.len() - max_pending;
                batch.drain(..overflow);
                dropped.fetch_add(overflow as u64, Ordering::Relaxed);
                warn!(
                    "ClickRecorder: pending batch over limit, dropped {} oldest events",
                    overflow
                );
            }
        }
    }
}
