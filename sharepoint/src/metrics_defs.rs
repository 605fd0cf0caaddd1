//! Metrics definitions for permission lookups.

use shared::metrics_defs::{MetricDef, MetricType};

pub const GRAPH_REQUEST_DURATION: MetricDef = MetricDef {
    name: "graph.request.duration",
    metric_type: MetricType::Histogram,
    description: "Time to complete a Graph API request in seconds",
};

pub const TOKEN_REQUEST_FAILED: MetricDef = MetricDef {
    name: "token.request.failed",
    metric_type: MetricType::Counter,
    description: "Number of token requests that did not return an access token",
};

pub const PERMISSIONS_PER_DOCUMENT: MetricDef = MetricDef {
    name: "permissions.per_document",
    metric_type: MetricType::Histogram,
    description: "Number of permission entries resolved for a document",
};

pub const ALL_METRICS: &[MetricDef] = &[
    GRAPH_REQUEST_DURATION,
    TOKEN_REQUEST_FAILED,
    PERMISSIONS_PER_DOCUMENT,
];
