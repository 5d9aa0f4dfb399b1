//! Per-invocation bookkeeping: [`FailoverTrace`] and [`RoutingDecision`] (§3).
//!
//! Both live exactly one request — neither is persisted.

use serde::Serialize;

use crate::models::slot::SlotType;

#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub provider_name: String,
    pub model_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

pub type FailoverTrace = Vec<AttemptRecord>;

/// The spec's abstract field name is `used_fallback`; the original source and
/// the distilled spec's own seed scenarios both use `used_resource_pool` as
/// the concrete wire name (see SPEC_FULL.md §3 field-naming resolution).
#[derive(Debug, Clone, Serialize)]
pub struct RoutingDecision {
    pub provider_name: String,
    pub model_id: String,
    pub slot_type: SlotType,
    pub used_resource_pool: bool,
    pub failover_trace: FailoverTrace,
}
