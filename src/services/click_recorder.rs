//! Background click accounting
//!
//! Clicks are submitted to a bounded queue and processed by a dispatcher
//! task that fans jobs out under a concurrency limit. Each job runs with its
//! own timeout, detached from the request that produced it.
//!
//! Delivery is best-effort: a full or closed queue drops the click, and a
//! failing step is logged without affecting the others.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Mutex, Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::cache::{self, CacheKey, CacheStore};
use crate::config::ClickRecorderConfig;
use crate::errors::LinkPulseError;
use crate::storage::{DurableStore, NewClickEvent, ShortLink, UserId};

/// 一次点击的记录任务
#[derive(Debug, Clone, PartialEq)]
pub struct ClickJob {
    pub link_id: i64,
    pub owner: Option<UserId>,
    pub ip: String,
    pub user_agent: String,
    pub clicked_at: DateTime<Utc>,
}

impl ClickJob {
    pub fn for_link(
        link: &ShortLink,
        ip: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            link_id: link.id,
            owner: link.owner,
            ip: ip.into(),
            user_agent: user_agent.into(),
            clicked_at: Utc::now(),
        }
    }
}

/// 计数快照
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClickRecorderStats {
    pub accepted: u64,
    pub dropped: u64,
    pub completed: u64,
    /// 至少有一步失败或超时的任务数
    pub failed: u64,
}

#[derive(Default)]
struct Shared {
    pending: AtomicUsize,
    idle: Notify,
    accepted: AtomicU64,
    dropped: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// 任务结束时（包括 panic）归还 pending 计数
struct PendingGuard(Arc<Shared>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

#[derive(Clone)]
struct Worker {
    store: Arc<dyn DurableStore>,
    cache: Arc<dyn CacheStore>,
    config: ClickRecorderConfig,
    shared: Arc<Shared>,
}

pub struct ClickRecorder {
    tx: mpsc::Sender<ClickJob>,
    shared: Arc<Shared>,
    shutdown: Arc<Notify>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl ClickRecorder {
    /// 启动调度任务（需要在 Tokio 运行时内调用）
    pub fn start(
        store: Arc<dyn DurableStore>,
        cache: Arc<dyn CacheStore>,
        config: ClickRecorderConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let shared = Arc::new(Shared::default());
        let shutdown = Arc::new(Notify::new());

        debug!(
            "ClickRecorder started: queue={}, in_flight={}, timeout={}ms",
            config.queue_capacity, config.max_in_flight, config.task_timeout_ms
        );

        let worker = Worker {
            store,
            cache,
            config,
            shared: shared.clone(),
        };
        let handle = tokio::spawn(dispatch(rx, worker, shutdown.clone()));

        Self {
            tx,
            shared,
            shutdown,
            dispatcher: Mutex::new(Some(handle)),
        }
    }

    /// 提交一次点击；从不阻塞、从不失败
    ///
    /// 返回是否被接收。队列已满或已关闭时丢弃并记录日志。
    pub fn record(&self, job: ClickJob) -> bool {
        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        match self.tx.try_send(job) {
            Ok(()) => {
                self.shared.accepted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                let (reason, job) = match e {
                    TrySendError::Full(job) => ("queue full", job),
                    TrySendError::Closed(job) => ("recorder closed", job),
                };
                drop(PendingGuard(self.shared.clone()));
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                let err = LinkPulseError::best_effort(format!(
                    "click on link {} dropped: {}",
                    job.link_id, reason
                ));
                warn!("{}", err);
                false
            }
        }
    }

    pub fn stats(&self) -> ClickRecorderStats {
        ClickRecorderStats {
            accepted: self.shared.accepted.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
            completed: self.shared.completed.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
        }
    }

    /// 等待所有已接收的任务完成
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// 停止接收新任务，并等待队列中剩余任务处理完
    pub async fn shutdown(&self) {
        self.shutdown.notify_one();
        if let Some(handle) = self.dispatcher.lock().await.take()
            && let Err(e) = handle.await
        {
            warn!("ClickRecorder dispatcher ended abnormally: {}", e);
        }
        self.wait_idle().await;
        debug!("ClickRecorder shut down: {:?}", self.stats());
    }
}

async fn dispatch(mut rx: mpsc::Receiver<ClickJob>, worker: Worker, shutdown: Arc<Notify>) {
    let permits = Arc::new(Semaphore::new(worker.config.max_in_flight.max(1)));

    loop {
        let job = tokio::select! {
            _ = shutdown.notified() => {
                // 关闭后继续排空已缓冲的任务
                rx.close();
                continue;
            }
            job = rx.recv() => job,
        };
        let Some(job) = job else { break };

        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let worker = worker.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let _pending = PendingGuard(worker.shared.clone());
            worker.run(job).await;
        });
    }

    trace!("ClickRecorder dispatcher exited");
}

impl Worker {
    async fn run(&self, job: ClickJob) {
        let link_id = job.link_id;
        let outcome = tokio::time::timeout(self.config.task_timeout(), self.apply(job)).await;

        let ok = match outcome {
            Ok(ok) => ok,
            Err(_) => {
                let err = LinkPulseError::best_effort(format!(
                    "click on link {} timed out after {}ms",
                    link_id, self.config.task_timeout_ms
                ));
                warn!("{}", err);
                false
            }
        };

        self.shared.completed.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.shared.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// 三个步骤互相独立，任何一步失败都不阻止其余步骤
    async fn apply(&self, job: ClickJob) -> bool {
        let mut ok = true;

        if let Err(e) = self.store.increment_redirect_count(job.link_id).await {
            warn!(
                "{}",
                LinkPulseError::best_effort(format!(
                    "increment redirect count for link {}: {}",
                    job.link_id, e
                ))
            );
            ok = false;
        }

        let event = NewClickEvent {
            shortlink_id: job.link_id,
            ip: job.ip,
            user_agent: job.user_agent,
            clicked_at: job.clicked_at,
        };
        if let Err(e) = self.store.insert_click_event(event).await {
            warn!(
                "{}",
                LinkPulseError::best_effort(format!(
                    "insert click event for link {}: {}",
                    job.link_id, e
                ))
            );
            ok = false;
        }

        match job.owner {
            Some(owner) => {
                cache::invalidate(
                    self.cache.as_ref(),
                    &[CacheKey::OwnerStats(owner), CacheKey::GlobalStats],
                )
                .await
            }
            None => cache::invalidate(self.cache.as_ref(), &[CacheKey::GlobalStats]).await,
        }

        trace!("Click recorded for link {}", job.link_id);
        ok
    }
}
