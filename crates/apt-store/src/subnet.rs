//! Subnet-form target expansion for the pipeline's stage 0.

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

/// Sentinel subnet that expands to every known user.
pub const ALL_USERS_SENTINEL: &str = "0.0.0.0";

/// Expands a query target into the set of concrete user ids it denotes.
///
/// - `0.0.0.0` expands to every user in `all_users`.
/// - Any other value that parses as `a.b.c.d/p` expands to every user whose
///   address (parsed as an IPv4 dotted quad) falls inside that prefix.
/// - Anything else is treated as a literal single user id, returned as-is
///   without checking membership in `all_users`; the caller (the pipeline
///   controller) is responsible for turning an unknown literal user into a
///   validation failure.
pub fn expand_target(target: &str, all_users: &[String]) -> Vec<String> {
    if target == ALL_USERS_SENTINEL {
        return all_users.to_vec();
    }

    if let Ok(network) = target.parse::<Ipv4Network>() {
        return all_users
            .iter()
            .filter(|user| {
                user.parse::<Ipv4Addr>()
                    .map(|addr| network.contains(addr))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
    }

    vec![target.to_string()]
}

/// Whether `target` is itself a parseable CIDR subnet form (used by callers
/// that need to distinguish "this was a subnet expansion" from "this was a
/// literal user id" for logging/reporting).
pub fn is_subnet_form(target: &str) -> bool {
    target == ALL_USERS_SENTINEL || target.parse::<Ipv4Network>().is_ok()
}
