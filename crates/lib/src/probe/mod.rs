//! Toolchain capability probe.
//!
//! Runs before any graph work. Checks are strictly sequential and fail fast:
//! the first missing capability ends the probe and nothing after it is
//! attempted.

mod host;
pub mod types;

use tracing::{debug, error, info};

pub use host::HostChecker;
pub use types::{Capability, CapabilityKind, CheckOutcome, ProbeFailure, ProbeReport, ProbeRequest, ProbeResult};

/// Decides whether a single capability is present.
pub trait CapabilityChecker {
  fn check(&self, capability: &Capability, request: &ProbeRequest) -> CheckOutcome;
}

/// Check every capability in `request`, in order.
///
/// # Errors
///
/// Returns [`ProbeFailure`] naming the first missing capability. Checks after
/// it are not run.
pub fn probe(request: &ProbeRequest, checker: &dyn CapabilityChecker) -> Result<ProbeReport, ProbeFailure> {
  let capabilities = request.capabilities();
  info!(count = capabilities.len(), compiler = %request.compiler, "probing toolchain");

  let mut results = Vec::with_capacity(capabilities.len());

  for capability in capabilities {
    debug!(kind = %capability.kind, name = %capability.name, "checking capability");

    match checker.check(&capability, request) {
      CheckOutcome::Available => {
        results.push(ProbeResult::available(capability));
      }
      CheckOutcome::Missing(diagnostic) => {
        error!(
          kind = %capability.kind,
          name = %capability.name,
          diagnostic = %diagnostic,
          "capability missing"
        );
        results.push(ProbeResult::missing(capability.clone(), diagnostic.clone()));
        return Err(ProbeFailure {
          capability,
          diagnostic,
          checked: results,
        });
      }
    }
  }

  info!(checked = results.len(), "toolchain probe passed");
  Ok(ProbeReport { results })
}
