use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with route, status.",
};

pub const UPSTREAM_REQUESTS: MetricDef = MetricDef {
    name: "upstream.requests",
    metric_type: MetricType::Counter,
    description: "Calls to the Shopify admin API. Tagged with operation, outcome.",
};

pub const ACCESS_REJECTED: MetricDef = MetricDef {
    name: "access.rejected",
    metric_type: MetricType::Counter,
    description: "Requests rejected by the access gate. Tagged with reason.",
};

pub const ALL_METRICS: &[MetricDef] = &[REQUEST_DURATION, UPSTREAM_REQUESTS, ACCESS_REJECTED];
