//! Lifecycle states for a payroll document and the authority view of it.
//!
//! ## Allowed Transitions
//!
//! ```text
//! NeedsGeneration ──▶ ToSign ──▶ Signed ──▶ ToCancel ──▶ Cancelled
//!        │              │ ▲        │                        ▲
//!        │              │ └────────┘ (re-signature)         │
//!        ▼              ▼                                   │
//!      Retry ◀───── (failure)                               │
//!        │              │                                   │
//!        └──────────────┴───────────────────────────────────┘
//!              (direct cancel, zero gateway calls)
//! ```
//!
//! `Retry` is re-entrant: processing a `Retry` record re-attempts full
//! generation, so `Retry → ToSign` is legal. `Cancelled` is terminal.
//! Documents never submitted to a provider (`ToSign`, `Retry` with no
//! folio) cancel directly, since there is nothing to revoke externally.
//! A stamped document that degraded back to `ToSign` or `Retry` still
//! holds its folio, so those states may also move to `ToCancel` and take
//! the provider revocation path.

use serde::{Deserialize, Serialize};

/// Where a payroll document stands in its stamping lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacStatus {
    /// No document has been generated yet.
    NeedsGeneration,
    /// Sealed bytes exist and await the provider's stamp.
    ToSign,
    /// The provider stamped the document and assigned a fiscal folio.
    Signed,
    /// A cancellation has been requested from the provider.
    ToCancel,
    /// The document is cancelled, locally or provider-confirmed.
    Cancelled,
    /// Generation or signing failed; a later pass re-attempts from
    /// scratch.
    Retry,
}

impl PacStatus {
    /// Canonical lowercase name, used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::NeedsGeneration => "needs_generation",
            Self::ToSign => "to_sign",
            Self::Signed => "signed",
            Self::ToCancel => "to_cancel",
            Self::Cancelled => "cancelled",
            Self::Retry => "retry",
        }
    }

    /// Whether the lifecycle table allows moving from `self` to `to`.
    ///
    /// Self-transitions are allowed everywhere except out of the
    /// terminal state; re-running an operation that lands where it
    /// started is not an error.
    pub fn can_transition(self, to: PacStatus) -> bool {
        use PacStatus::*;
        if self == to {
            return self != Cancelled || to == Cancelled;
        }
        matches!(
            (self, to),
            (NeedsGeneration, ToSign)
                | (NeedsGeneration, Retry)
                | (ToSign, Signed)
                | (ToSign, Retry)
                | (ToSign, ToCancel)
                | (ToSign, Cancelled)
                | (Retry, ToSign)
                | (Retry, ToCancel)
                | (Retry, Cancelled)
                | (Signed, ToSign)
                | (Signed, ToCancel)
                | (Signed, Retry)
                | (ToCancel, Cancelled)
        )
    }
}

impl std::fmt::Display for PacStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What the tax authority currently says about a stamped document.
///
/// Written only by reconciliation; the stamping lifecycle never touches
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SatStatus {
    /// Never queried.
    Undefined,
    /// The authority does not know the folio.
    NotFound,
    /// The authority reports the document cancelled.
    Cancelled,
    /// The authority reports the document in force.
    Valid,
    /// Queried, but the answer matched no known status string.
    None,
}

impl SatStatus {
    /// Map the authority's published status string.
    pub fn from_authority(status: &str) -> Self {
        match status {
            "No Encontrado" => Self::NotFound,
            "Cancelado" => Self::Cancelled,
            "Vigente" => Self::Valid,
            _ => Self::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PacStatus::*;

    const ALL: [PacStatus; 6] = [NeedsGeneration, ToSign, Signed, ToCancel, Cancelled, Retry];

    #[test]
    fn happy_path_is_legal() {
        assert!(NeedsGeneration.can_transition(ToSign));
        assert!(ToSign.can_transition(Signed));
        assert!(Signed.can_transition(ToCancel));
        assert!(ToCancel.can_transition(Cancelled));
    }

    #[test]
    fn cancelled_is_terminal() {
        for to in ALL {
            if to == Cancelled {
                continue;
            }
            assert!(
                !Cancelled.can_transition(to),
                "cancelled must not reach {to}"
            );
        }
    }

    #[test]
    fn unsubmitted_documents_cancel_directly() {
        assert!(ToSign.can_transition(Cancelled));
        assert!(Retry.can_transition(Cancelled));
        assert!(!Signed.can_transition(Cancelled));
    }

    #[test]
    fn degraded_stamped_documents_reach_to_cancel() {
        assert!(ToSign.can_transition(ToCancel));
        assert!(Retry.can_transition(ToCancel));
    }

    #[test]
    fn retry_is_reentrant() {
        assert!(Retry.can_transition(ToSign));
        assert!(ToSign.can_transition(Retry));
    }

    #[test]
    fn resignature_reopens_a_signed_document() {
        assert!(Signed.can_transition(ToSign));
    }

    #[test]
    fn state_machine_is_closed() {
        let expected: [(PacStatus, &[PacStatus]); 6] = [
            (NeedsGeneration, &[NeedsGeneration, ToSign, Retry]),
            (ToSign, &[ToSign, Signed, Retry, ToCancel, Cancelled]),
            (Signed, &[Signed, ToSign, ToCancel, Retry]),
            (ToCancel, &[ToCancel, Cancelled]),
            (Cancelled, &[Cancelled]),
            (Retry, &[Retry, ToSign, ToCancel, Cancelled]),
        ];
        for (from, reachable) in expected {
            for to in ALL {
                assert_eq!(
                    from.can_transition(to),
                    reachable.contains(&to),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn authority_status_strings_map() {
        assert_eq!(SatStatus::from_authority("Vigente"), SatStatus::Valid);
        assert_eq!(SatStatus::from_authority("Cancelado"), SatStatus::Cancelled);
        assert_eq!(
            SatStatus::from_authority("No Encontrado"),
            SatStatus::NotFound
        );
        assert_eq!(SatStatus::from_authority("¿?"), SatStatus::None);
    }
}
