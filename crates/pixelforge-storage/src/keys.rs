//! Storage key constants.

/// Well-known keys in the client's persistent storage.
pub struct StorageKeys;

impl StorageKeys {
    /// Bearer token written by the HTTP client.
    pub const TOKEN: &'static str = "token";

    /// Session snapshot (JSON) written by the session store.
    pub const SESSION: &'static str = "auth";
}
