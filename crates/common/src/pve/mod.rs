/// Proxmox 资源归一化
///
/// 将 `cluster/resources` 返回的扁平记录列表按类型分发到四个集合，
/// 纯函数，按输入顺序保留每种类型内的记录顺序。

pub mod resources;
pub mod thermal;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::cluster::{ClusterSnapshot, WorkloadKind};
use resources::RawResource;

/// 归一化错误
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// 记录不是对象或缺少字符串类型的 `type` 字段
    #[error("第 {index} 条资源记录无法识别: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// 归一化集群资源列表
pub fn normalize(records: &[Value]) -> Result<ClusterSnapshot, NormalizeError> {
    let mut snapshot = ClusterSnapshot::default();
    let mut dropped = 0usize;

    for (index, record) in records.iter().enumerate() {
        let resource = RawResource::deserialize(record)
            .map_err(|source| NormalizeError::InvalidRecord { index, source })?;

        match resource {
            RawResource::Node(raw) => snapshot.nodes.push(raw.into_node()),
            RawResource::Qemu(raw) => snapshot.vms.push(raw.into_workload(WorkloadKind::Vm)),
            RawResource::Lxc(raw) => snapshot
                .containers
                .push(raw.into_workload(WorkloadKind::Container)),
            RawResource::Storage(raw) => snapshot.storages.push(raw.into_volume()),
            RawResource::Unknown => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!("忽略了 {} 条未知类型的资源记录", dropped);
    }

    Ok(snapshot)
}
