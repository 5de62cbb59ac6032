/// 轮询单飞保护
///
/// 同一时间最多只有一次上游轮询在进行。轮询进行中到达的请求共享这次轮询的结果，
/// 轮询结束后到达的请求会发起新的轮询，不缓存历史结果。
/// 轮询在独立任务中执行，等待方全部断开时轮询照常完成并释放占位。

use common::ClusterSnapshot;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::cluster_service::{ClusterService, StatusError};

type PollResult = Result<ClusterSnapshot, StatusError>;
type PollFn = dyn Fn() -> BoxFuture<'static, PollResult> + Send + Sync;

#[derive(Clone)]
pub struct PollGuard {
    poll_fn: Arc<PollFn>,
    in_flight: Arc<Mutex<Option<Shared<BoxFuture<'static, PollResult>>>>>,
}

impl PollGuard {
    pub fn new(service: ClusterService) -> Self {
        Self::from_fn(move || {
            let service = service.clone();
            async move { service.get_cluster_status().await }.boxed()
        })
    }

    pub fn from_fn<F>(poll_fn: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, PollResult> + Send + Sync + 'static,
    {
        Self {
            poll_fn: Arc::new(poll_fn),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// 获取集群状态，必要时发起新的轮询
    pub async fn poll(&self) -> PollResult {
        let future = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.as_ref() {
                Some(existing) => {
                    debug!("轮询进行中，等待其结果");
                    existing.clone()
                }
                None => {
                    let poll = (self.poll_fn)();
                    let slot = self.in_flight.clone();
                    let handle = tokio::spawn(async move {
                        let result = poll.await;
                        slot.lock().await.take();
                        result
                    });

                    let slot = self.in_flight.clone();
                    let shared = async move {
                        match handle.await {
                            Ok(result) => result,
                            Err(e) => {
                                // 任务异常退出时占位未被释放
                                slot.lock().await.take();
                                Err(StatusError::PollAborted(e.to_string()))
                            }
                        }
                    }
                    .boxed()
                    .shared();
                    *in_flight = Some(shared.clone());
                    shared
                }
            }
        };

        future.await
    }
}
