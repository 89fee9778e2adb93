// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the GSLB engine.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Traffic-Distribution (MTD) Constants
// ============================================================================

/// Record type used when creating an MTD base for GSLB
pub const MTD_BASE_TYPE_GSLB: &str = "GSLB";

/// Error code returned when an MTD base with the same name already exists
pub const MTD_BASE_EXISTS_ERROR: &str = "DB_UNIQUENESS_VIOLATION";

/// Error code returned when an MTD host already exists on the base
pub const MTD_HOST_EXISTS_ERROR: &str = "MTD_HOST_EXISTS_ON_MTD_BASE";

/// Error code returned when an MTD host cannot be found
pub const MTD_HOST_NOT_FOUND_ERROR: &str = "COULD_NOT_FIND_MTD_HOST";

/// Error code returned when an MTD base cannot be found
pub const MTD_BASE_NOT_FOUND_ERROR: &str = "COULD_NOT_FIND_MTD_BASE";

/// Fallback text when the MTD API reports a failure without any error codes
pub const MTD_UNKNOWN_ERROR: &str = "unknown error";

/// Separator used when joining multiple MTD error codes into one message
pub const MTD_ERROR_SEPARATOR: &str = " | ";

/// Hosts fail over across data centers
pub const MTD_DC_FAILOVER: bool = true;

/// Load-balancing distribution value sent with every host
pub const MTD_LOAD_BALANCING_DISTRIBUTION: u32 = 1;

/// Locality scope for proximity-based routing
pub const LOCALITY_SCOPE_PROXIMITY: u32 = 0;

/// Locality scope for weighted round-robin routing
pub const LOCALITY_SCOPE_ROUND_ROBIN: u32 = 2;

/// Weight given to an enabled target without an explicit weight
pub const DEFAULT_ENABLED_WEIGHT_PERCENT: u32 = 100;

/// Weight given to a disabled target without an explicit weight
pub const DEFAULT_DISABLED_WEIGHT_PERCENT: u32 = 0;

// ============================================================================
// Health Check Constants
// ============================================================================

/// Prefix of every generated health check name (`gslb-<protocol>-<port>`)
pub const HEALTH_CHECK_NAME_PREFIX: &str = "gslb";

/// Interval between health probes in seconds
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u32 = 5;

/// Health probe timeout in seconds
pub const DEFAULT_HEALTH_CHECK_TIMEOUT_SECS: u32 = 2;

/// Delay before re-probing a target marked down, in seconds
pub const DEFAULT_HEALTH_CHECK_RETRY_DELAY_SECS: u32 = 30;

/// Consecutive failures before a target is marked down
pub const DEFAULT_HEALTH_CHECK_FAILURE_COUNT: u32 = 3;

/// Expected HTTP status for HTTP health checks
pub const HEALTH_CHECK_EXPECTED_HTTP_STATUS: u16 = 200;

// ============================================================================
// Retry Constants
// ============================================================================

/// Attempts made for the MTD base create-or-get sequence
pub const DEFAULT_BASE_CREATE_ATTEMPTS: u32 = 2;

/// Fixed delay between base create-or-get attempts in seconds
pub const DEFAULT_BASE_CREATE_RETRY_DELAY_SECS: u64 = 5;

// ============================================================================
// DNS (Infoblox) Constants
// ============================================================================

/// Default Infoblox WAPI version
pub const DEFAULT_WAPI_VERSION: &str = "v2.5";

/// Infoblox error marker for a record that already exists
pub const INFOBLOX_CONFLICT_ERROR: &str = "IBDataConflictError";

/// Human-readable form of the "already exists" condition
pub const DNS_RECORD_EXISTS_TEXT: &str = "already exists";

/// Infoblox error marker for a record that does not exist
pub const INFOBLOX_NOT_FOUND_ERROR: &str = "AdmConDataNotFoundError";

/// Human-readable form of the "not found" condition
pub const DNS_RECORD_NOT_FOUND_TEXT: &str = "data not found";

// ============================================================================
// Platform Request Constants
// ============================================================================

/// Cloud priority that marks a cloud as primary
pub const CLOUD_PRIORITY_PRIMARY: &str = "1";

/// Cloud admin status for an active cloud
pub const CLOUD_STATUS_ACTIVE: &str = "active";

/// Cloud admin status for an inactive cloud
pub const CLOUD_STATUS_INACTIVE: &str = "inactive";

/// Distribution value selecting proximity routing
pub const DISTRIBUTION_PROXIMITY: &str = "proximity";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for the Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 2;

/// Default HTTP timeout for gateway calls in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Environment variable naming the configuration file
pub const ENV_CONFIG_PATH: &str = "GSLB_CONFIG";

/// Environment variable overriding the MTD auth key
pub const ENV_MTD_AUTH_KEY: &str = "GSLB_MTD_AUTH_KEY";

/// Environment variable overriding the DNS password
pub const ENV_DNS_PASSWORD: &str = "GSLB_DNS_PASSWORD";
