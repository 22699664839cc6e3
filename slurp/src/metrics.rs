//! Metrics definitions for slurp runs.

/// Label for the reason an item was discarded.
pub const REASON_LABEL: &str = "reason";

/// Label for the key of the producer feeding a run.
pub const PRODUCER_LABEL: &str = "producer";

// Analysis request slurper metrics

/// Counter for items dropped by the analysis request slurper without delivery.
pub const SLURP_ITEMS_DISCARDED_TOTAL: &str = "slurp_items_discarded_total";

/// Counter for items that went through enrichment.
pub const SLURP_ITEMS_ENRICHED_TOTAL: &str = "slurp_items_enriched_total";

/// Counter for item deliveries to analysis requests, one per receiving request.
pub const SLURP_ITEMS_DELIVERED_TOTAL: &str = "slurp_items_delivered_total";

/// Histogram for the time spent enriching one item, in seconds.
pub const SLURP_ENRICHMENT_DURATION_SECONDS: &str = "slurp_enrichment_duration_seconds";

// Service metrics

/// Counter for runs started by the service.
pub const SLURP_RUNS_STARTED_TOTAL: &str = "slurp_runs_started_total";

/// Gauge for runs currently active in the service.
pub const SLURP_RUNS_ACTIVE: &str = "slurp_runs_active";
