//! Cache key prefixes and builders
//!
//! Every cached object lives under `{prefix}{id}`. The prefixes double as
//! lock names: account removal serializes on [`ACTION_PLAN_PREFIX`].
//!
//! # Example
//!
//! ```
//! use apolo_cache::keys;
//!
//! assert_eq!(keys::cache_key(keys::ACTION_PLAN_PREFIX, "PLAN_1"), "apl_PLAN_1");
//! assert_eq!(keys::lock_key(keys::ACTION_PLAN_PREFIX), "lock:apl_");
//! ```

/// Action plans, by plan id
pub const ACTION_PLAN_PREFIX: &str = "apl_";

/// Per-account index of the plans it belongs to, by account id
pub const ACCOUNT_ACTION_PLANS_PREFIX: &str = "aap_";

/// Destinations, by destination id
pub const DESTINATION_PREFIX: &str = "dst_";

/// Reverse destination index, by prefix
pub const REVERSE_DESTINATION_PREFIX: &str = "rds_";

/// Action lists, by actions id
pub const ACTIONS_PREFIX: &str = "act_";

/// Accounts, by `tenant:account`
pub const ACCOUNT_PREFIX: &str = "acc_";

/// Prefix of the Redis keys backing named locks
pub const LOCK_PREFIX: &str = "lock:";

/// Default TTL for cached objects (5 minutes)
pub const CACHE_TTL_SECS: u64 = 300;

/// Prefixes the reloader knows how to load
pub const RELOADABLE_PREFIXES: [&str; 6] = [
    ACTION_PLAN_PREFIX,
    ACCOUNT_ACTION_PLANS_PREFIX,
    DESTINATION_PREFIX,
    REVERSE_DESTINATION_PREFIX,
    ACTIONS_PREFIX,
    ACCOUNT_PREFIX,
];

/// Build the cache key of an object
pub fn cache_key(prefix: &str, id: &str) -> String {
    format!("{}{}", prefix, id)
}

/// Build the Redis key backing a named lock
pub fn lock_key(name: &str) -> String {
    format!("{}{}", LOCK_PREFIX, name)
}
