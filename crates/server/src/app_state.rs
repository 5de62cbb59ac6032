/// 应用全局状态

use std::sync::Arc;

use crate::{
    auth::Authenticator,
    config::Config,
    metrics::PollMetrics,
    services::{ClusterService, DomainService, PollGuard},
};

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// 登录与会话校验
    pub auth: Authenticator,
    /// 集群状态轮询（单飞）
    pub poll_guard: PollGuard,
    pub metrics: PollMetrics,
}

impl AppState {
    pub fn new(config: Config) -> prometheus::Result<Self> {
        let metrics = PollMetrics::new()?;
        let cluster_service = ClusterService::new(&config, metrics.clone());

        Ok(Self {
            auth: Authenticator::new(&config),
            poll_guard: PollGuard::new(cluster_service),
            metrics,
            config: Arc::new(config),
        })
    }

    /// 书签域名服务
    pub fn domain_service(&self) -> DomainService {
        DomainService::new(&self.config)
    }
}
