/// 集群快照模型
///
/// 每次轮询从上游原始数据重新构建，序列化返回后即丢弃

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 集群快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub nodes: Vec<Node>,
    pub vms: Vec<Workload>,
    pub containers: Vec<Workload>,
    pub storages: Vec<StorageVolume>,
}

impl ClusterSnapshot {
    /// 在线节点数量
    pub fn running_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_running).count()
    }

    /// 运行中的虚拟机与容器数量
    pub fn running_workloads(&self) -> usize {
        self.vms
            .iter()
            .chain(self.containers.iter())
            .filter(|w| w.is_running)
            .count()
    }

    /// 已附带温度数据的节点数量
    pub fn nodes_with_thermal(&self) -> usize {
        self.nodes.iter().filter(|n| n.thermal.is_some()).count()
    }

    /// 所有节点内存汇总
    pub fn node_memory(&self) -> ByteUsage {
        self.nodes.iter().fold(ByteUsage::default(), |acc, n| ByteUsage {
            used: acc.used.saturating_add(n.memory.used),
            total: acc.total.saturating_add(n.memory.total),
        })
    }
}

/// CPU 使用情况
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuUsage {
    /// 使用率 0.0 - 1.0
    pub utilization: f64,
    /// 核心数
    pub cores: u64,
}

/// 字节用量（内存、磁盘）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteUsage {
    pub used: u64,
    pub total: u64,
}

/// 物理节点
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub name: String,
    pub status: String,
    pub is_running: bool,
    pub cpu: CpuUsage,
    pub memory: ByteUsage,
    pub storage: ByteUsage,
    /// 运行时间（秒）
    pub uptime: u64,
    /// 温度数据，仅在二次状态查询成功后存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal: Option<Thermal>,
    /// 上游 thermalstate，结构由上游定义，原样透传
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermalstate: Option<Map<String, Value>>,
    /// 上游 cpuinfo，原样透传
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpuinfo: Option<Value>,
}

/// 工作负载类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadKind {
    #[default]
    Vm,
    Container,
}

/// 虚拟机或容器
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    pub id: String,
    pub kind: WorkloadKind,
    pub vm_id: u64,
    pub name: String,
    /// 所属节点名称
    pub node: String,
    pub status: String,
    pub is_running: bool,
    pub cpu: CpuUsage,
    pub memory: ByteUsage,
    pub storage: ByteUsage,
    pub uptime: u64,
}

/// 存储卷
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageVolume {
    pub id: String,
    pub name: String,
    pub node: String,
    pub status: String,
    pub is_running: bool,
    pub used: u64,
    pub total: u64,
    pub is_shared: bool,
}

/// 节点温度数据，从 `thermalstate` 中提取
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thermal {
    pub package_temp: Option<i64>,
    pub core_temps: Vec<i64>,
}

impl Thermal {
    /// 核心平均温度（四舍五入）
    pub fn average_core_temp(&self) -> Option<i64> {
        if self.core_temps.is_empty() {
            return None;
        }
        let sum: i64 = self.core_temps.iter().sum();
        Some((sum as f64 / self.core_temps.len() as f64).round() as i64)
    }
}
