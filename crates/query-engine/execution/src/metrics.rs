//! Metrics setup and update for the service.

use prometheus::core::{AtomicI64, AtomicU64, GenericCounter, GenericGauge};

#[derive(Debug, Clone)]
pub struct Metrics {
    pub query_total: GenericCounter<AtomicU64>,
    pub generation_failures_total: GenericCounter<AtomicU64>,
    pub validation_rejections_total: GenericCounter<AtomicU64>,
    pub execution_failures_total: GenericCounter<AtomicU64>,
    pub pool_size: GenericGauge<AtomicI64>,
    pub pool_idle_count: GenericGauge<AtomicI64>,
    pub pool_max_connections: GenericGauge<AtomicI64>,
}

/// Create a new int counter metric and register it with the provided
/// Prometheus Registry
fn add_int_counter_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<GenericCounter<AtomicU64>, prometheus::Error> {
    let int_counter =
        prometheus::IntCounter::with_opts(prometheus::Opts::new(metric_name, metric_description))?;
    metrics_registry.register(Box::new(int_counter.clone()))?;
    Ok(int_counter)
}

/// Create a new int gauge metric and register it with the provided
/// Prometheus Registry
fn add_int_gauge_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<GenericGauge<AtomicI64>, prometheus::Error> {
    let int_gauge =
        prometheus::IntGauge::with_opts(prometheus::Opts::new(metric_name, metric_description))?;
    metrics_registry.register(Box::new(int_gauge.clone()))?;
    Ok(int_gauge)
}

/// Setup counters and gauges used to produce Prometheus metrics
pub fn initialise_metrics(
    metrics_registry: &mut prometheus::Registry,
) -> Result<Metrics, prometheus::Error> {
    let query_total = add_int_counter_metric(
        metrics_registry,
        "chatsql_query_total",
        "Total successful queries.",
    )?;

    let generation_failures_total = add_int_counter_metric(
        metrics_registry,
        "chatsql_generation_failures_total",
        "Total queries that failed while generating SQL.",
    )?;

    let validation_rejections_total = add_int_counter_metric(
        metrics_registry,
        "chatsql_validation_rejections_total",
        "Total generated statements denied by validation.",
    )?;

    let execution_failures_total = add_int_counter_metric(
        metrics_registry,
        "chatsql_execution_failures_total",
        "Total approved statements that failed during execution.",
    )?;

    let pool_size = add_int_gauge_metric(
        metrics_registry,
        "chatsql_pool_size",
        "The number of connections currently active. This includes idle connections.",
    )?;

    let pool_idle_count = add_int_gauge_metric(
        metrics_registry,
        "chatsql_pool_idle",
        "The number of connections active and idle (not in use).",
    )?;

    let pool_max_connections = add_int_gauge_metric(
        metrics_registry,
        "chatsql_pool_max_connections",
        "The maximum number of connections that this pool should maintain.",
    )?;

    Ok(Metrics {
        query_total,
        generation_failures_total,
        validation_rejections_total,
        execution_failures_total,
        pool_size,
        pool_idle_count,
        pool_max_connections,
    })
}

/// update all Prometheus gauges that are polled rather than incremented
pub fn update_pool_metrics(pool: &sqlx::PgPool, metrics: &Metrics) {
    let pool_size: i64 = pool.size().into();
    metrics.pool_size.set(pool_size);

    let pool_idle: i64 = pool.num_idle().try_into().unwrap_or(i64::MAX);
    metrics.pool_idle_count.set(pool_idle);

    let max_connections: i64 = pool.options().get_max_connections().into();
    metrics.pool_max_connections.set(max_connections);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_exactly_once() {
        let mut registry = prometheus::Registry::new();
        let metrics = initialise_metrics(&mut registry).unwrap();
        metrics.query_total.inc();
        assert_eq!(metrics.query_total.get(), 1);

        // registering the same names twice is an error
        assert!(initialise_metrics(&mut registry).is_err());
    }
}
