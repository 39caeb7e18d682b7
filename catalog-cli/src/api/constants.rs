//! Endpoints and well-known values for the Firestore REST API

/// Production Firestore endpoint
pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";

/// Database id used when none is configured
pub const DEFAULT_DATABASE: &str = "(default)";

/// Token endpoint used when the key file does not name one
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth scope granting Firestore read/write access
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for the signed assertion, in seconds
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Environment variable pointing the client at a local emulator
pub const EMULATOR_HOST_ENV: &str = "FIRESTORE_EMULATOR_HOST";

/// Bearer token the emulator accepts as an administrator
pub const EMULATOR_TOKEN: &str = "owner";

pub const REQUEST_TIMEOUT_SECS: u64 = 30;
