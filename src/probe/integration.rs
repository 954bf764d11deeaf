//! Host-integration probe: a correlated request/echo round trip across
//! the surface boundary, the same pending-map discipline the
//! file-existence checks use. A transport that never answers reads as a
//! timeout, and the probe reports the messaging path broken rather than
//! hanging.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The probe's outbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationPing {
    /// Correlation id; the echo must carry it back.
    pub request_id: String,
    /// Payload the host must echo.
    pub test: String,
    /// Milliseconds since the epoch at send time.
    pub timestamp_ms: i64,
}

/// The host's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationEcho {
    /// Correlation id copied from the ping.
    pub request_id: String,
    /// The echoed payload.
    pub echo: String,
    /// The host's own timestamp.
    pub timestamp_ms: i64,
}

/// One round trip to the host. `None` means the transport timed out;
/// implementors own the deadline.
pub trait EchoTransport {
    /// Send the ping and wait (bounded) for the echo.
    fn round_trip(&mut self, ping: &IntegrationPing) -> Option<IntegrationEcho>;
}

/// Transport that answers locally, the in-process stand-in for a live
/// host, used by the CLI probe run.
#[derive(Debug, Default)]
pub struct LoopbackTransport;

impl EchoTransport for LoopbackTransport {
    fn round_trip(&mut self, ping: &IntegrationPing) -> Option<IntegrationEcho> {
        Some(IntegrationEcho {
            request_id: ping.request_id.clone(),
            echo: ping.test.clone(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        })
    }
}

/// Host-integration probe results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostIntegrationResults {
    /// An answer arrived before the transport's deadline.
    pub messaging_works: bool,
    /// The answer carried the right correlation id and payload.
    pub echo_matches: bool,
    /// Observed round-trip latency, ms.
    pub round_trip_ms: f64,
}

/// Run the round trip once.
pub fn probe_host_integration(transport: &mut dyn EchoTransport) -> HostIntegrationResults {
    let ping = IntegrationPing {
        request_id: "probe-integration-0".to_string(),
        test: "ping".to_string(),
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
    };

    let start = Instant::now();
    let echo = transport.round_trip(&ping);
    let round_trip_ms = start.elapsed().as_secs_f64() * 1000.0;

    match echo {
        Some(echo) => {
            let echo_matches = echo.request_id == ping.request_id && echo.echo == ping.test;
            if !echo_matches {
                log::warn!("integration echo mismatched: {echo:?}");
            }
            HostIntegrationResults {
                messaging_works: true,
                echo_matches,
                round_trip_ms,
            }
        }
        None => {
            log::warn!("integration round trip timed out");
            HostIntegrationResults {
                messaging_works: false,
                echo_matches: false,
                round_trip_ms,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_round_trip_matches() {
        let mut transport = LoopbackTransport;
        let results = probe_host_integration(&mut transport);
        assert!(results.messaging_works);
        assert!(results.echo_matches);
    }

    struct SilentTransport;

    impl EchoTransport for SilentTransport {
        fn round_trip(&mut self, _ping: &IntegrationPing) -> Option<IntegrationEcho> {
            None
        }
    }

    #[test]
    fn test_timeout_reports_broken_messaging() {
        let results = probe_host_integration(&mut SilentTransport);
        assert!(!results.messaging_works);
        assert!(!results.echo_matches);
    }

    struct WrongIdTransport;

    impl EchoTransport for WrongIdTransport {
        fn round_trip(&mut self, ping: &IntegrationPing) -> Option<IntegrationEcho> {
            Some(IntegrationEcho {
                request_id: "someone-else".to_string(),
                echo: ping.test.clone(),
                timestamp_ms: 0,
            })
        }
    }

    #[test]
    fn test_miscorrelated_echo_is_rejected() {
        let results = probe_host_integration(&mut WrongIdTransport);
        assert!(results.messaging_works);
        assert!(!results.echo_matches);
    }
}
