//! Route handlers, one module per resource

pub mod alerts;
pub mod devices;
pub mod health;
pub mod readings;
pub mod stats;

/// Clamp an optional `limit` parameter to `[1, MAX_QUERY_LIMIT]`
pub(crate) fn clamp_limit(limit: Option<usize>, default: usize) -> usize {
    limit
        .unwrap_or(default)
        .clamp(1, crate::api::types::MAX_QUERY_LIMIT)
}
