//! Metrics definitions for the navigation client.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub description: &'static str,
}

#[macro_export]
macro_rules! counter {
    ($def:expr) => {
        metrics::counter!($def.name)
    };
}

#[macro_export]
macro_rules! histogram {
    ($def:expr) => {
        metrics::histogram!($def.name)
    };
}

pub const CACHE_HIT: MetricDef = MetricDef {
    name: "cache.hit",
    metric_type: MetricType::Counter,
    description: "Menu lookups served from a fresh cache entry",
};

pub const CACHE_MISS: MetricDef = MetricDef {
    name: "cache.miss",
    metric_type: MetricType::Counter,
    description: "Menu lookups that had to be fetched from upstream",
};

pub const CACHE_STALE: MetricDef = MetricDef {
    name: "cache.stale",
    metric_type: MetricType::Counter,
    description: "Expired cache entries served because the refresh failed",
};

pub const REQUEST_FAILED: MetricDef = MetricDef {
    name: "request.failed",
    metric_type: MetricType::Counter,
    description: "Upstream requests that failed at the transport level",
};

pub const REQUEST_FAIL_FAST: MetricDef = MetricDef {
    name: "request.fail_fast",
    metric_type: MetricType::Counter,
    description: "Requests short-circuited by an earlier failure of the same client",
};

pub const FIXTURE_SERVED: MetricDef = MetricDef {
    name: "fixture.served",
    metric_type: MetricType::Counter,
    description: "Responses served from local fixture files",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Upstream request duration in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[
    CACHE_HIT,
    CACHE_MISS,
    CACHE_STALE,
    REQUEST_FAILED,
    REQUEST_FAIL_FAST,
    FIXTURE_SERVED,
    REQUEST_DURATION,
];
