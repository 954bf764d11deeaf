//! Capability probe: one-shot engine capability detection.

use serde::Serialize;

use crate::engine::{EngineCapabilities, TerminalEngine};

/// Capability probe results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityResults {
    /// The detected capability set.
    pub capabilities: EngineCapabilities,
    /// True when the operations the surface controller needs are all
    /// present.
    pub core_present: bool,
    /// The failure description when `core_present` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Detect capabilities and check the core requirement in one pass.
pub fn probe_capability(engine: &mut dyn TerminalEngine) -> CapabilityResults {
    let capabilities = EngineCapabilities::detect(engine);
    match capabilities.require_core() {
        Ok(()) => CapabilityResults {
            capabilities,
            core_present: true,
            error: None,
        },
        Err(e) => CapabilityResults {
            capabilities,
            core_present: false,
            error: Some(format!("{e:#}")),
        },
    }
}
