//! Session state machine.

/// Lifecycle state of a browsing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Session object exists but has not been registered yet.
    #[default]
    Uninitialized,
    /// Current directory is the session root.
    AtRoot,
    /// Current directory is somewhere below the root.
    AtSubdirectory,
    /// Time-to-live elapsed; waiting for the next sweep.
    Tombstoned,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Uninitialized -> AtRoot
    /// - AtRoot -> AtRoot | AtSubdirectory | Tombstoned
    /// - AtSubdirectory -> AtRoot | AtSubdirectory | Tombstoned
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, target),
            (Uninitialized, AtRoot)
                | (AtRoot, AtRoot)
                | (AtRoot, AtSubdirectory)
                | (AtRoot, Tombstoned)
                | (AtSubdirectory, AtRoot)
                | (AtSubdirectory, AtSubdirectory)
                | (AtSubdirectory, Tombstoned)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: SessionState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::DirTunnelError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Tombstoned)
    }

    /// Check if the session can serve requests.
    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::AtRoot | SessionState::AtSubdirectory)
    }
}
