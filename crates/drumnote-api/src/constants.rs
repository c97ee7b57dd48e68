//! API constants
//!
//! Everything except the health probes is mounted below [`API_PREFIX`].

/// Versioned prefix for all application routes.
pub const API_PREFIX: &str = "/api/v1";

/// Scheme advertised in `WWW-Authenticate` on 401 responses.
pub const BEARER_SCHEME: &str = "Bearer";

/// Readiness probe timeout for the database round-trip.
pub const READINESS_TIMEOUT_SECS: u64 = 5;

/// Description given to the admin role when it is created on first use.
pub const ADMIN_ROLE_DESCRIPTION: &str = "Administrator with full access";

/// Body limit for every route that is not a file upload.
pub const MAX_JSON_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Allowance for multipart boundaries and form fields on top of the file size limit.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
