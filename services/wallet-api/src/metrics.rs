use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    pub static ref WALLET_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "wallet_operations_total",
        "Total wallet operations by type and outcome",
        &["operation", "outcome"]
    )
    .expect("metric can be created");

    pub static ref WALLET_OPERATION_DURATION: HistogramVec = register_histogram_vec!(
        "wallet_operation_duration_seconds",
        "Wallet operation duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    )
    .expect("metric can be created");

    pub static ref WALLET_BALANCE_QUERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "wallet_balance_queries_total",
        "Total balance lookups by outcome",
        &["outcome"]
    )
    .expect("metric can be created");
}

/// Record the outcome label of one operation
pub fn record_operation(operation: &str, outcome: &str) {
    WALLET_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn record_balance_query(outcome: &str) {
    WALLET_BALANCE_QUERIES_TOTAL
        .with_label_values(&[outcome])
        .inc();
}

/// Generate metrics output in Prometheus text format
pub fn metrics_handler() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
