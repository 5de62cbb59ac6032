/// Box Dashboard - Server
///
/// 个人仪表盘后端：登录、书签域名下发与 Proxmox 集群状态聚合

mod api;
mod app_state;
mod auth;
mod config;
mod extractors;
mod metrics;
mod services;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use tracing::{info, warn};

use crate::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 加载配置
    let cfg = config::Config::from_env()?;

    // 初始化日志
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level)),
        )
        .init();

    info!("🚀 启动 Box Dashboard Server...");
    info!("✅ 配置加载成功，数据目录: {}", cfg.data_dir.display());

    if cfg.uses_default_password() {
        warn!("⚠️ 未设置 DASHBOARD_PASSWORD_SHA256，使用默认密码 change-me");
    }
    if !cfg.pve_config_path().exists() {
        warn!("⚠️ 未找到 {}，集群状态接口将返回未配置", cfg.pve_config_path().display());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.server_port));

    // 创建应用状态
    let app_state = AppState::new(cfg)?;
    info!("✅ 指标注册成功");

    // 构建应用路由
    let app = api::app_router(app_state);

    // 启动服务器
    info!("🎯 服务器监听在 http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
