//! Operator, host and session identity stamped onto saved records.

use uuid::Uuid;

fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Login name of the operator, or "unknown"
pub fn machine_user() -> String {
    first_env(&["USER", "USERNAME", "LOGNAME"]).unwrap_or_else(|| "unknown".to_string())
}

/// Host name, or "unknown"
pub fn machine_host() -> String {
    first_env(&["HOSTNAME", "COMPUTERNAME"])
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Short random session id (8 lowercase hex characters)
pub fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
