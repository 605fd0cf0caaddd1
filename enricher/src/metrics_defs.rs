//! Metrics definitions for the enrichment handler.

use shared::metrics_defs::{MetricDef, MetricType};

pub const INVOCATION_SUCCESS: MetricDef = MetricDef {
    name: "enricher.invocation.success",
    metric_type: MetricType::Counter,
    description: "Number of documents enriched and published",
};

pub const INVOCATION_FAILURE: MetricDef = MetricDef {
    name: "enricher.invocation.failure",
    metric_type: MetricType::Counter,
    description: "Number of invocations that failed. Tagged with error kind",
};

pub const INVOCATION_DURATION: MetricDef = MetricDef {
    name: "enricher.invocation.duration",
    metric_type: MetricType::Histogram,
    description: "Time to handle one invocation in seconds",
};

pub const PUBLISHED_BYTES: MetricDef = MetricDef {
    name: "enricher.published.bytes",
    metric_type: MetricType::Histogram,
    description: "Size of each artifact written to the output bucket",
};

pub const ALL_METRICS: &[MetricDef] = &[
    INVOCATION_SUCCESS,
    INVOCATION_FAILURE,
    INVOCATION_DURATION,
    PUBLISHED_BYTES,
];
