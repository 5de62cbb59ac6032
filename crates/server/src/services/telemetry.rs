/// 节点温度数据补充
///
/// 对每个在线节点额外查询一次节点状态，成功时附加温度与 cpuinfo。
/// 单个节点失败只记录日志，节点原样返回，不影响整体快照。

use common::{Node, Thermal};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use super::pve_client::{node_status_path, PveError, PveTransport};

/// 单个节点的补充结果
#[derive(Debug)]
pub enum EnrichOutcome {
    /// 查询成功
    Enriched(Node),
    /// 查询失败，节点保持原样
    Unavailable { node: Node, reason: PveError },
    /// 节点不在线，未查询
    Skipped(Node),
}

impl EnrichOutcome {
    pub fn into_node(self) -> Node {
        match self {
            EnrichOutcome::Enriched(node) => node,
            EnrichOutcome::Unavailable { node, .. } => node,
            EnrichOutcome::Skipped(node) => node,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, EnrichOutcome::Unavailable { .. })
    }
}

/// 批量补充结果
#[derive(Debug)]
pub struct Enrichment {
    /// 与输入顺序一致
    pub nodes: Vec<Node>,
    pub failures: usize,
}

/// 查询单个节点状态并合并
pub async fn enrich_node<T>(transport: &T, node: Node) -> EnrichOutcome
where
    T: PveTransport + ?Sized,
{
    let result = transport
        .get(&node_status_path(&node.name))
        .await
        .and_then(|status| apply_node_status(node.clone(), status));

    match result {
        Ok(enriched) => {
            debug!(
                "节点 {} 温度数据: {:?}",
                enriched.name,
                enriched.thermal.as_ref().and_then(|t| t.package_temp)
            );
            EnrichOutcome::Enriched(enriched)
        }
        Err(reason) => {
            warn!("节点 {} 状态查询失败，跳过温度数据: {}", node.name, reason);
            EnrichOutcome::Unavailable { node, reason }
        }
    }
}

/// 把节点状态中的 `thermalstate` / `cpuinfo` 合并到节点
fn apply_node_status(mut node: Node, status: Value) -> Result<Node, PveError> {
    let Value::Object(mut fields) = status else {
        return Err(PveError::MalformedResponse("节点状态不是 JSON 对象".to_string()));
    };

    match fields.remove("thermalstate") {
        Some(Value::Object(raw)) => {
            node.thermal = Some(Thermal::from_thermalstate(&raw));
            node.thermalstate = Some(raw);
        }
        _ => {
            node.thermal = None;
            node.thermalstate = None;
        }
    }
    node.cpuinfo = fields.remove("cpuinfo").filter(|v| !v.is_null());

    Ok(node)
}

/// 并发补充所有在线节点
///
/// 等待全部节点完成（成功或失败）后返回，失败互不影响
pub async fn enrich_running_nodes<T>(transport: &T, nodes: Vec<Node>) -> Enrichment
where
    T: PveTransport + ?Sized,
{
    let tasks = nodes.into_iter().map(|node| async move {
        if node.is_running {
            enrich_node(transport, node).await
        } else {
            EnrichOutcome::Skipped(node)
        }
    });

    let outcomes = join_all(tasks).await;
    let failures = outcomes.iter().filter(|o| o.is_failure()).count();

    Enrichment {
        nodes: outcomes.into_iter().map(EnrichOutcome::into_node).collect(),
        failures,
    }
}
