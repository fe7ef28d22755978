//! # System Constants
//!
//! Defaults and column names shared by the orchestration, postprocessing and
//! adapter layers.

/// Default batching and retry parameters used when no configuration is supplied
pub mod defaults {
    /// Records submitted to the remote service per request
    pub const BATCH_SIZE: usize = 25;

    /// Remote requests allowed in flight at once
    pub const MAX_CONCURRENT: usize = 10;

    /// Retries after the first attempt for transient failures
    pub const MAX_RETRIES: u32 = 3;

    pub const BASE_RETRY_DELAY_MS: u64 = 1_000;
    pub const MAX_RETRY_DELAY_MS: u64 = 60_000;
    pub const BACKOFF_MULTIPLIER: f64 = 2.0;
    pub const JITTER_FACTOR: f64 = 0.1;

    /// Per-call timeout for a single remote request
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 300;

    pub const DECIMAL_PLACES: u32 = 3;
}

/// Column names used when flattening enriched rows into a table
pub mod columns {
    pub const PLOT_ID: &str = "plot_id";
    pub const EXTERNAL_ID: &str = "external_id";
    pub const GEOMETRY_TYPE: &str = "geometry_type";
    pub const CENTROID_LON: &str = "centroid_lon";
    pub const CENTROID_LAT: &str = "centroid_lat";
    pub const VERTEX_COUNT: &str = "vertex_count";
    pub const GEOMETRY_AREA_HA: &str = "geometry_area_ha";
    pub const ADMIN_CODE: &str = "admin_code";
    pub const COUNTRY: &str = "country";
    pub const ISO3: &str = "iso3";
    pub const REGION: &str = "region";

    /// Prefixes for local and region columns whose names a statistic already uses
    pub const LOCAL_PREFIX: &str = "local_";
    pub const ADMIN_PREFIX: &str = "admin_";

    /// Total plot area reported by the remote service, in hectares
    pub const TOTAL_AREA: &str = "area";

    /// Metadata columns emitted ahead of the statistic columns, in order
    pub const LEADING: &[&str] = &[
        PLOT_ID,
        EXTERNAL_ID,
        GEOMETRY_TYPE,
        CENTROID_LON,
        CENTROID_LAT,
        VERTEX_COUNT,
        GEOMETRY_AREA_HA,
        ADMIN_CODE,
        COUNTRY,
        ISO3,
        REGION,
    ];
}

pub mod system {
    pub const PLOTSTATS_CORE_VERSION: &str = "0.1.0";

    /// Environment variable selecting the configuration environment
    pub const ENVIRONMENT_VARIABLE: &str = "PLOTSTATS_ENV";

    /// Prefix for environment variable configuration overrides
    pub const CONFIG_ENV_PREFIX: &str = "PLOTSTATS";

    /// Base configuration file name inside the config directory
    pub const CONFIG_FILE_STEM: &str = "plotstats-config";
}
