//! Blocked network origin.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{WardenError, WardenResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedOrigin {
    pub origin_ip: String,
    pub reason: String,
    pub blocked_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateBlockedOrigin {
    pub origin_ip: String,
    pub reason: String,
    pub blocked_by: String,
}

/// Parse an origin address and return its canonical text form.
///
/// `::FFFF:10.0.0.1`, `10.0.0.1 ` and `10.0.0.1` must all hit the same
/// block-list entry, so every lookup and insert goes through here.
pub fn canonical_ip(raw: &str) -> WardenResult<String> {
    let addr: IpAddr = raw
        .trim()
        .parse()
        .map_err(|_| WardenError::validation(format!("not an IP address: {raw:?}")))?;
    let addr = match addr {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    };
    Ok(addr.to_string())
}
