//! Provenance gate and the access capability it grants.

/// Decides whether the current caller may retrieve secrets at all.
///
/// Best-effort: this restricts a privileged operation to a known caller, it
/// is not a boundary against an attacker with code execution.
pub trait ProvenanceGate {
    fn is_authorized(&self) -> bool;
}

/// Capability to call the vault. Only obtainable from a gate that authorized
/// the caller, so holding one is proof the gate was consulted.
#[derive(Debug)]
pub struct AccessGrant {
    _private: (),
}

impl AccessGrant {
    /// Evaluate `gate` once. `None` if it denies the caller.
    pub fn from_gate(gate: &dyn ProvenanceGate) -> Option<Self> {
        gate.is_authorized().then_some(AccessGrant { _private: () })
    }
}

/// Gate for callers whose provenance is established by the embedding
/// process itself (for example, the server binary that owns the provider).
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedCaller;

impl ProvenanceGate for TrustedCaller {
    fn is_authorized(&self) -> bool {
        true
    }
}

impl<F: Fn() -> bool> ProvenanceGate for F {
    fn is_authorized(&self) -> bool {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trusted_caller_gets_grant() {
        assert!(AccessGrant::from_gate(&TrustedCaller).is_some());
    }

    #[test]
    fn denying_gate_gets_nothing() {
        let deny = || false;
        assert!(AccessGrant::from_gate(&deny).is_none());
    }
}
