//! Warehouse table schemas.
//!
//! All DDL is idempotent (`CREATE ... IF NOT EXISTS`) and runs at startup.
//! Timestamps are DateTime64(3); queries bind epoch-millisecond i64 values
//! through `fromUnixTimestamp64Milli`.

/// SQL for creating the database.
pub const CREATE_DATABASE: &str = r#"
CREATE DATABASE IF NOT EXISTS castwatch
"#;

/// SQL for creating the append-only inference results table.
///
/// One row per inference run, written by the listener and never updated or
/// deleted by this system.
pub const CREATE_INFERENCE_RESULTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS castwatch.inference_results (
    res_id String,
    res_image_path String,
    raw_image_path String,
    model_ver LowCardinality(String),
    pred_class LowCardinality(String),
    pred_confidence Float64,
    pred_speed_ms Float64,
    res_insert_datetime DateTime64(3)
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(res_insert_datetime)
ORDER BY (res_insert_datetime, res_id)
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the weekly inference-time metrics table.
///
/// At most one row per (aggregation_start, aggregation_end) window; the
/// engine does not enforce uniqueness, the upsert coordinator does.
pub const CREATE_INFERENCE_METRICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS castwatch.inference_metrics (
    id String,
    inference_time_min Float64,
    inference_time_med Float64,
    inference_time_mean Float64,
    inference_time_max Float64,
    insert_datetime DateTime64(3),
    aggregation_start DateTime64(3),
    aggregation_end DateTime64(3)
)
ENGINE = MergeTree()
ORDER BY (aggregation_start, aggregation_end)
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the weekly confidence-score metrics table.
pub const CREATE_CONFIDENCE_METRICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS castwatch.confidencescore_metrics (
    id String,
    confidence_score_min Float64,
    confidence_score_med Float64,
    confidence_score_mean Float64,
    confidence_score_max Float64,
    insert_datetime DateTime64(3),
    aggregation_start DateTime64(3),
    aggregation_end DateTime64(3)
)
ENGINE = MergeTree()
ORDER BY (aggregation_start, aggregation_end)
SETTINGS index_granularity = 8192
"#;

/// SQL for creating the weekly class-frequency metrics table.
pub const CREATE_CLASS_METRICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS castwatch.prediction_class_metrics (
    id String,
    pred_class_pass_freq UInt64,
    pred_class_fail_freq UInt64,
    insert_datetime DateTime64(3),
    aggregation_start DateTime64(3),
    aggregation_end DateTime64(3)
)
ENGINE = MergeTree()
ORDER BY (aggregation_start, aggregation_end)
SETTINGS index_granularity = 8192
"#;

/// All DDL statements in creation order.
pub fn all_tables() -> Vec<&'static str> {
    vec![
        CREATE_DATABASE,
        CREATE_INFERENCE_RESULTS_TABLE,
        CREATE_INFERENCE_METRICS_TABLE,
        CREATE_CONFIDENCE_METRICS_TABLE,
        CREATE_CLASS_METRICS_TABLE,
    ]
}
