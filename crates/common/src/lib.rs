/// Box Dashboard - 公共库
///
/// 提供 Server 共享的集群数据模型、Proxmox 资源归一化、错误处理、工具函数等

pub mod errors;
pub mod models;
pub mod pve;
pub mod utils;

// 重新导出常用类型
pub use errors::{Error, Result};
pub use models::cluster::{
    ByteUsage, ClusterSnapshot, CpuUsage, Node, StorageVolume, Thermal, Workload, WorkloadKind,
};
pub use pve::{normalize, NormalizeError};
