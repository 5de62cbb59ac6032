/// Proxmox `cluster/resources` 原始记录
///
/// 上游返回的是以 `type` 区分的扁平记录列表。数值字段缺失、为 null、
/// 为 false 或无法解析时统一取 0，字符串字段缺失时取空字符串。

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::cluster::{ByteUsage, CpuUsage, Node, StorageVolume, Workload, WorkloadKind};
use crate::models::status;

/// 原始资源记录
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RawResource {
    Node(RawCompute),
    Qemu(RawCompute),
    Lxc(RawCompute),
    Storage(RawStorage),
    /// 未知类型，归一化时直接丢弃
    #[serde(other)]
    Unknown,
}

/// 节点、虚拟机、容器共用的计算资源字段
#[derive(Debug, Default, Deserialize)]
pub struct RawCompute {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub vmid: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub node: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cpu: f64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub maxcpu: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub mem: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub maxmem: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub disk: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub maxdisk: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub uptime: u64,
}

impl RawCompute {
    fn cpu_usage(&self) -> CpuUsage {
        CpuUsage {
            utilization: self.cpu,
            cores: self.maxcpu,
        }
    }

    fn memory(&self) -> ByteUsage {
        ByteUsage {
            used: self.mem,
            total: self.maxmem,
        }
    }

    fn disk(&self) -> ByteUsage {
        ByteUsage {
            used: self.disk,
            total: self.maxdisk,
        }
    }

    /// 节点记录中 `node` 字段即节点名称
    pub fn into_node(self) -> Node {
        Node {
            is_running: self.status == status::NODE_ONLINE,
            cpu: self.cpu_usage(),
            memory: self.memory(),
            storage: self.disk(),
            uptime: self.uptime,
            thermal: None,
            thermalstate: None,
            cpuinfo: None,
            id: self.id,
            name: self.node,
            status: self.status,
        }
    }

    pub fn into_workload(self, kind: WorkloadKind) -> Workload {
        Workload {
            kind,
            vm_id: self.vmid,
            is_running: self.status == status::WORKLOAD_RUNNING,
            cpu: self.cpu_usage(),
            memory: self.memory(),
            storage: self.disk(),
            uptime: self.uptime,
            id: self.id,
            name: self.name,
            node: self.node,
            status: self.status,
        }
    }
}

/// 存储记录
#[derive(Debug, Default, Deserialize)]
pub struct RawStorage {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub storage: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub node: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub disk: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub maxdisk: u64,
    /// 仅当上游值等于 1 时为 true
    #[serde(default, deserialize_with = "shared_flag")]
    pub shared: bool,
}

impl RawStorage {
    pub fn into_volume(self) -> StorageVolume {
        let name = if self.storage.is_empty() {
            self.name
        } else {
            self.storage
        };

        StorageVolume {
            is_running: self.status == status::STORAGE_AVAILABLE,
            is_shared: self.shared,
            used: self.disk,
            total: self.maxdisk,
            id: self.id,
            name,
            node: self.node,
            status: self.status,
        }
    }
}

/// 宽松数值解析：非负有限数，其他情况取 0
fn number_from_value(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };

    if n.is_finite() && n > 0.0 {
        n
    } else {
        0.0
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(number_from_value).unwrap_or(0.0))
}

/// 宽松整数解析：整数原样保留，小数截断，其他情况同 [`number_from_value`]
fn integer_from_value(value: &Value) -> u64 {
    let exact = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    exact.unwrap_or_else(|| number_from_value(value).trunc() as u64)
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(integer_from_value).unwrap_or(0))
}

fn shared_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(number_from_value) == Some(1.0))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(true)) => "true".to_string(),
        _ => String::new(),
    })
}
