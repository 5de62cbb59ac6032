/// 集群状态聚合服务
///
/// 一次轮询：拉取集群资源 -> 归一化 -> 并发补充节点温度 -> 返回快照。
/// 主请求失败则整次轮询失败，节点补充失败只降级。

use common::models::constants::CLUSTER_RESOURCES_PATH;
use common::utils::{format_bytes, format_uptime, generate_id};
use common::{normalize, ClusterSnapshot};
use serde_json::Value;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, info_span, Instrument};

use super::pve_client::{PveClient, PveError, PveTransport};
use super::telemetry::enrich_running_nodes;
use crate::config::{Config, PveConfig};
use crate::metrics::PollMetrics;

/// 轮询错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("Proxmox 未配置: {0}")]
    ConfigMissing(String),

    #[error("获取集群资源失败: {0}")]
    FetchFailed(#[from] PveError),

    #[error("集群资源归一化失败: {0}")]
    NormalizeFailed(String),

    #[error("轮询任务异常退出: {0}")]
    PollAborted(String),
}

impl StatusError {
    /// 返回给前端的提示
    pub fn public_message(&self) -> &'static str {
        match self {
            StatusError::ConfigMissing(_) => "Proxmox not configured",
            StatusError::FetchFailed(_)
            | StatusError::NormalizeFailed(_)
            | StatusError::PollAborted(_) => "Failed to fetch Proxmox status",
        }
    }

    /// 指标标签
    pub fn outcome(&self) -> &'static str {
        match self {
            StatusError::ConfigMissing(_) => "config_missing",
            StatusError::FetchFailed(PveError::Timeout) => "timeout",
            StatusError::FetchFailed(_) => "fetch_failed",
            StatusError::NormalizeFailed(_) => "normalize_failed",
            StatusError::PollAborted(_) => "aborted",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StatusError::FetchFailed(PveError::Timeout))
    }
}

/// 一次轮询的结果
#[derive(Debug)]
pub struct StatusReport {
    pub snapshot: ClusterSnapshot,
    /// 温度补充失败的节点数
    pub enrichment_failures: usize,
}

/// 通过给定传输层构建集群快照
pub async fn collect_snapshot<T>(transport: &T) -> Result<StatusReport, StatusError>
where
    T: PveTransport + ?Sized,
{
    let payload = transport.get(CLUSTER_RESOURCES_PATH).await?;

    let Value::Array(records) = payload else {
        return Err(StatusError::FetchFailed(PveError::MalformedResponse(
            "集群资源不是 JSON 数组".to_string(),
        )));
    };
    debug!("收到 {} 条集群资源记录", records.len());

    let mut snapshot =
        normalize(&records).map_err(|e| StatusError::NormalizeFailed(e.to_string()))?;

    let nodes = std::mem::take(&mut snapshot.nodes);
    let enrichment = enrich_running_nodes(transport, nodes).await;
    snapshot.nodes = enrichment.nodes;

    Ok(StatusReport {
        snapshot,
        enrichment_failures: enrichment.failures,
    })
}

/// 集群状态服务
#[derive(Clone)]
pub struct ClusterService {
    pve_config_path: PathBuf,
    timeout: Duration,
    metrics: PollMetrics,
}

impl ClusterService {
    pub fn new(config: &Config, metrics: PollMetrics) -> Self {
        Self {
            pve_config_path: config.pve_config_path(),
            timeout: config.pve_timeout(),
            metrics,
        }
    }

    /// 执行一次完整轮询
    pub async fn get_cluster_status(&self) -> Result<ClusterSnapshot, StatusError> {
        let span = info_span!("pve_poll", poll_id = %generate_id());
        self.poll().instrument(span).await
    }

    async fn poll(&self) -> Result<ClusterSnapshot, StatusError> {
        let start = Instant::now();
        let result = self.run_poll().await;
        let elapsed = start.elapsed();

        match &result {
            Ok(report) => {
                self.metrics.observe_poll("success", elapsed);
                self.metrics.add_enrichment_failures(report.enrichment_failures);
                log_summary(report, elapsed);
            }
            Err(e) => {
                self.metrics.observe_poll(e.outcome(), elapsed);
                error!("❌ Proxmox 轮询失败 ({:?}): {}", elapsed, e);
            }
        }

        result.map(|report| report.snapshot)
    }

    async fn run_poll(&self) -> Result<StatusReport, StatusError> {
        // 每次轮询重新读取配置
        let pve = PveConfig::load(&self.pve_config_path)
            .map_err(|e| StatusError::ConfigMissing(e.to_string()))?;
        let client = PveClient::new(&pve, self.timeout)?;

        collect_snapshot(&client).await
    }
}

fn log_summary(report: &StatusReport, elapsed: Duration) {
    let snapshot = &report.snapshot;
    let memory = snapshot.node_memory();

    info!(
        "✅ 集群状态: 节点 {}/{} 在线, 运行中负载 {}, 存储 {}, 内存 {} / {}, 耗时 {:?}",
        snapshot.running_nodes(),
        snapshot.nodes.len(),
        snapshot.running_workloads(),
        snapshot.storages.len(),
        format_bytes(memory.used),
        format_bytes(memory.total),
        elapsed,
    );

    if report.enrichment_failures > 0 {
        info!(
            "温度数据: {}/{} 个节点可用",
            snapshot.nodes_with_thermal(),
            snapshot.running_nodes()
        );
    }

    for node in &snapshot.nodes {
        debug!(
            "节点 {} [{}] CPU {:.1}% 运行 {} 封装温度 {:?} 核心均温 {:?}",
            node.name,
            node.status,
            node.cpu.utilization * 100.0,
            format_uptime(node.uptime),
            node.thermal.as_ref().and_then(|t| t.package_temp),
            node.thermal.as_ref().and_then(|t| t.average_core_temp()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pve_config, spawn_upstream, FakeTransport};
    use axum::{routing::get, Json, Router};
    use serde_json::json;

    fn scenario_transport() -> FakeTransport {
        FakeTransport::new()
            .with(
                CLUSTER_RESOURCES_PATH,
                Ok(json!([{
                    "type": "node", "node": "pve1", "status": "online",
                    "cpu": 0.42, "maxcpu": 8, "mem": 4294967296u64, "maxmem": 8589934592u64
                }])),
            )
            .with(
                "/api2/json/nodes/pve1/status",
                Ok(json!({"thermalstate": {"Package.id.0": "55"}})),
            )
    }

    #[tokio::test]
    async fn test_end_to_end_snapshot() {
        let report = collect_snapshot(&scenario_transport()).await.unwrap();
        let snapshot = report.snapshot;

        assert_eq!(snapshot.nodes.len(), 1);
        let node = &snapshot.nodes[0];
        assert_eq!(node.name, "pve1");
        assert!(node.is_running);
        assert_eq!(node.cpu.utilization, 0.42);
        assert_eq!(node.cpu.cores, 8);
        assert_eq!(node.memory.used, 4294967296);
        assert_eq!(node.memory.total, 8589934592);
        assert_eq!(node.thermal.as_ref().unwrap().package_temp, Some(55));
        assert_eq!(report.enrichment_failures, 0);
    }

    #[tokio::test]
    async fn test_one_enrichment_failure_is_isolated() {
        let transport = FakeTransport::new()
            .with(
                CLUSTER_RESOURCES_PATH,
                Ok(json!([
                    {"type": "node", "node": "pve1", "status": "online"},
                    {"type": "node", "node": "pve2", "status": "online"},
                    {"type": "node", "node": "pve3", "status": "online"},
                    {"type": "qemu", "vmid": 100, "node": "pve2", "status": "running"}
                ])),
            )
            .with("/api2/json/nodes/pve1/status", Ok(json!({"thermalstate": {"Core 0": "40"}})))
            .with("/api2/json/nodes/pve2/status", Err(PveError::Timeout))
            .with("/api2/json/nodes/pve3/status", Ok(json!({"thermalstate": {"Core 0": "41"}})));

        let report = collect_snapshot(&transport).await.unwrap();
        let snapshot = report.snapshot;

        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(snapshot.nodes_with_thermal(), 2);
        assert!(snapshot.nodes[1].thermal.is_none());
        assert_eq!(snapshot.vms.len(), 1);
        assert_eq!(report.enrichment_failures, 1);
    }

    #[tokio::test]
    async fn test_primary_failure_is_fatal() {
        let transport = FakeTransport::new()
            .with(CLUSTER_RESOURCES_PATH, Err(PveError::UpstreamStatus(500)))
            .with("/api2/json/nodes/pve1/status", Ok(json!({"thermalstate": {}})));

        let result = collect_snapshot(&transport).await;
        assert_eq!(
            result.unwrap_err(),
            StatusError::FetchFailed(PveError::UpstreamStatus(500))
        );
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_non_array_payload() {
        let transport = FakeTransport::new().with(CLUSTER_RESOURCES_PATH, Ok(json!({"nodes": []})));

        assert!(matches!(
            collect_snapshot(&transport).await,
            Err(StatusError::FetchFailed(PveError::MalformedResponse(_)))
        ));
    }

    #[tokio::test]
    async fn test_unclassifiable_record() {
        let transport = FakeTransport::new().with(CLUSTER_RESOURCES_PATH, Ok(json!(["node"])));

        let err = collect_snapshot(&transport).await.unwrap_err();
        assert!(matches!(err, StatusError::NormalizeFailed(_)));
        assert_eq!(err.public_message(), "Failed to fetch Proxmox status");
    }

    #[tokio::test]
    async fn test_primary_timeout() {
        let router = Router::new().route(
            CLUSTER_RESOURCES_PATH,
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"data": []}))
            }),
        );
        let host = spawn_upstream(router).await;
        let client = PveClient::new(&pve_config(&host), Duration::from_millis(200)).unwrap();

        let err = collect_snapshot(&client).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.outcome(), "timeout");
    }

    fn service_for(dir: &std::path::Path, metrics: PollMetrics) -> ClusterService {
        ClusterService {
            pve_config_path: dir.join("pve.json"),
            timeout: Duration::from_secs(5),
            metrics,
        }
    }

    #[tokio::test]
    async fn test_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let metrics = PollMetrics::new().unwrap();
        let service = service_for(dir.path(), metrics.clone());

        let err = service.get_cluster_status().await.unwrap_err();
        assert!(matches!(err, StatusError::ConfigMissing(_)));
        assert_eq!(err.public_message(), "Proxmox not configured");
        assert_eq!(metrics.polls("config_missing"), 1);
    }

    #[tokio::test]
    async fn test_poll_against_upstream() {
        let router = Router::new()
            .route(
                CLUSTER_RESOURCES_PATH,
                get(|| async {
                    Json(json!({"data": [
                        {"type": "node", "node": "pve1", "status": "online", "maxcpu": 4},
                        {"type": "lxc", "vmid": 200, "name": "dns", "node": "pve1", "status": "running"},
                        {"type": "storage", "storage": "local", "node": "pve1", "status": "available"}
                    ]}))
                }),
            )
            .route(
                "/api2/json/nodes/pve1/status",
                get(|| async { Json(json!({"data": {"thermalstate": {"Package.id.0": "61"}}})) }),
            );
        let host = spawn_upstream(router).await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pve.json"),
            json!({"host": host, "tokenId": "a", "tokenSecret": "b", "verifySsl": false}).to_string(),
        )
        .unwrap();

        let metrics = PollMetrics::new().unwrap();
        let service = service_for(dir.path(), metrics.clone());
        let snapshot = service.get_cluster_status().await.unwrap();

        assert_eq!(snapshot.nodes[0].thermal.as_ref().unwrap().package_temp, Some(61));
        assert_eq!(snapshot.containers.len(), 1);
        assert_eq!(snapshot.storages.len(), 1);
        assert_eq!(metrics.polls("success"), 1);
        assert_eq!(metrics.enrichment_failures(), 0);
    }
}
