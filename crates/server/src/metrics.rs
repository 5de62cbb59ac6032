/// 轮询指标
///
/// 仅统计进程内计数，不做持久化

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct PollMetrics {
    polls_total: IntCounterVec,
    enrichment_failures_total: IntCounter,
    poll_duration_seconds: Histogram,
    registry: Arc<Registry>,
}

impl PollMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let polls_total = IntCounterVec::new(
            Opts::new("dashboard_pve_polls_total", "Proxmox status polls by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(polls_total.clone()))?;

        let enrichment_failures_total = IntCounter::new(
            "dashboard_pve_enrichment_failures_total",
            "Node status calls that failed and were skipped",
        )?;
        registry.register(Box::new(enrichment_failures_total.clone()))?;

        let poll_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("dashboard_pve_poll_duration_seconds", "Proxmox status poll latency")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0]),
        )?;
        registry.register(Box::new(poll_duration_seconds.clone()))?;

        Ok(Self {
            polls_total,
            enrichment_failures_total,
            poll_duration_seconds,
            registry: Arc::new(registry),
        })
    }

    /// 记录一次轮询
    pub fn observe_poll(&self, outcome: &str, elapsed: Duration) {
        self.polls_total.with_label_values(&[outcome]).inc();
        self.poll_duration_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn add_enrichment_failures(&self, count: usize) {
        self.enrichment_failures_total.inc_by(count as u64);
    }

    pub fn polls(&self, outcome: &str) -> u64 {
        self.polls_total.with_label_values(&[outcome]).get()
    }

    pub fn enrichment_failures(&self) -> u64 {
        self.enrichment_failures_total.get()
    }

    /// Prometheus 文本格式输出
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
