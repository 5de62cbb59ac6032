/// 共享数据模型
///
/// 定义集群快照及其组成部分的数据结构

pub mod cluster;

/// 上游状态标签
///
/// Proxmox 返回的 `status` 字段是自由字符串，这里只列出用于派生布尔值的取值
pub mod status {
    /// 节点在线
    pub const NODE_ONLINE: &str = "online";

    /// 虚拟机/容器运行中
    pub const WORKLOAD_RUNNING: &str = "running";

    /// 存储可用
    pub const STORAGE_AVAILABLE: &str = "available";
}

/// 常量定义
pub mod constants {
    /// 默认 Server 端口
    pub const DEFAULT_SERVER_PORT: u16 = 3008;

    /// 默认上游请求超时（秒）
    pub const DEFAULT_PVE_TIMEOUT_SECS: u64 = 10;

    /// 集群资源列表路径
    pub const CLUSTER_RESOURCES_PATH: &str = "/api2/json/cluster/resources";

    /// 温度数据中的 CPU 封装温度键
    pub const PACKAGE_TEMP_KEY: &str = "Package.id.0";

    /// 温度数据中核心温度键的前缀
    pub const CORE_TEMP_PREFIX: &str = "Core";
}
