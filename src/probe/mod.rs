//! Feasibility probes against the terminal engine.
//!
//! Each probe is an independent check over the engine's observable
//! behavior; the runner executes them in sequence and one probe's
//! failure never aborts the rest. Capability detection runs first and
//! gates the engine-dependent probes, mirroring an initialization that
//! fails fast instead of optional-chaining through every call.

pub mod api_compat;
pub mod capability;
pub mod input;
pub mod integration;
pub mod rendering;

use serde::Serialize;

use crate::bench::{run_throughput, MemoryProbe, ThroughputReport};
use crate::engine::TerminalEngine;

pub use self::api_compat::{probe_api_compatibility, ApiCompatibilityResults};
pub use self::capability::{probe_capability, CapabilityResults};
pub use self::input::{probe_input, InputResults};
pub use self::integration::{
    probe_host_integration, EchoTransport, HostIntegrationResults, LoopbackTransport,
};
pub use self::rendering::{probe_rendering, RenderingResults};

/// Aggregated probe results for one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    /// RFC 3339 timestamp of the run.
    pub timestamp: String,
    /// Capability probe; always present.
    pub capability: CapabilityResults,
    /// Rendering probe; skipped when the capability gate fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendering: Option<RenderingResults>,
    /// Input-feedback probe; skipped when the capability gate fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<InputResults>,
    /// API-compatibility probe; skipped when the capability gate fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_compatibility: Option<ApiCompatibilityResults>,
    /// Throughput benchmark; skipped when the capability gate fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput: Option<ThroughputReport>,
    /// Host messaging round trip; independent of the engine.
    pub host_integration: HostIntegrationResults,
}

/// Run every probe.
pub fn run_all(
    engine: &mut dyn TerminalEngine,
    transport: &mut dyn EchoTransport,
    memory: &dyn MemoryProbe,
    throughput_mib: usize,
) -> ProbeReport {
    let timestamp = chrono::Utc::now().to_rfc3339();

    let capability = probe_capability(engine);
    let (rendering, input, api_compatibility, throughput) = if capability.core_present {
        (
            Some(probe_rendering(engine)),
            Some(probe_input(engine)),
            Some(probe_api_compatibility(engine)),
            Some(run_throughput(engine, memory, throughput_mib)),
        )
    } else {
        log::warn!("engine capability gate failed; skipping engine probes");
        (None, None, None, None)
    };

    let host_integration = probe_host_integration(transport);

    ProbeReport {
        timestamp,
        capability,
        rendering,
        input,
        api_compatibility,
        throughput,
        host_integration,
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
