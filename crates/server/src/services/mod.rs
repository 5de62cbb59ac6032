pub mod cluster_service;
pub mod domain_service;
pub mod poll_guard;
pub mod pve_client;
pub mod telemetry;

pub use cluster_service::ClusterService;
pub use domain_service::DomainService;
pub use poll_guard::PollGuard;
