//! Workspace lifecycle (spec §3, §4.7).

use eecp_core::{EecpError, Millis, Result, RotationInterval, TimeWindow};

/// A workspace's lifecycle status. Transitions are monotone: `Active` may
/// become `Expired` or `Revoked`; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceStatus {
    Active,
    Expired,
    Revoked,
}

impl WorkspaceStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Revoked)
    }
}

/// Parameters the relay validates before allocating a [`Workspace`]
/// (spec §4.7).
pub struct WorkspaceConfig {
    pub rotation_interval_minutes: u32,
    pub max_participants: u32,
    pub expires_in_ms: Millis,
    pub grace_period_ms: Millis,
    pub allow_extension: bool,
}

/// A collaborative editing workspace, as tracked by the relay.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub created_at: Millis,
    pub time_window: TimeWindow,
    pub max_participants: u32,
    pub allow_extension: bool,
    pub status: WorkspaceStatus,
    pub current_state_snapshot: Option<Vec<u8>>,
}

impl Workspace {
    /// Validate and construct a new workspace (spec §4.7 "Create").
    pub fn create(now: Millis, config: WorkspaceConfig) -> Result<Self> {
        let rotation_interval = RotationInterval::from_minutes(config.rotation_interval_minutes)?;
        if config.max_participants == 0 {
            return Err(EecpError::config("max_participants must be > 0"));
        }
        if config.expires_in_ms == 0 {
            return Err(EecpError::config("expires_at must be after now"));
        }
        let time_window = TimeWindow::new(
            now,
            now + config.expires_in_ms,
            rotation_interval,
            config.grace_period_ms,
        )?;
        Ok(Self {
            created_at: now,
            time_window,
            max_participants: config.max_participants,
            allow_extension: config.allow_extension,
            status: WorkspaceStatus::Active,
            current_state_snapshot: None,
        })
    }

    pub fn expires_at(&self) -> Millis {
        self.time_window.end
    }

    /// Extend expiry by `minutes`, only while active and extension is
    /// allowed (spec §4.7 "Extend").
    pub fn extend(&mut self, minutes: u32) -> Result<()> {
        if !self.allow_extension || self.status != WorkspaceStatus::Active {
            return Err(EecpError::workspace("workspace cannot be extended"));
        }
        self.time_window.extend_by_minutes(minutes);
        Ok(())
    }

    /// Revoke immediately (spec §4.7 "Revoke"): terminal, expiry pulled to
    /// `now`.
    pub fn revoke(&mut self, now: Millis) {
        self.time_window.end = now;
        self.status = WorkspaceStatus::Revoked;
    }

    /// Transition to `expired` if past expiry and not already terminal
    /// (spec §4.8, Temporal Cleanup action 1).
    pub fn expire_if_due(&mut self, now: Millis) -> bool {
        if !self.status.is_terminal() && now >= self.expires_at() {
            self.status = WorkspaceStatus::Expired;
            true
        } else {
            false
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == WorkspaceStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WorkspaceConfig {
        WorkspaceConfig {
            rotation_interval_minutes: 15,
            max_participants: 10,
            expires_in_ms: 30 * 60_000,
            grace_period_ms: 5_000,
            allow_extension: true,
        }
    }

    #[test]
    fn rejects_invalid_rotation_interval() {
        let mut c = config();
        c.rotation_interval_minutes = 7;
        assert!(Workspace::create(0, c).is_err());
    }

    #[test]
    fn extend_requires_active_and_allowed() {
        let mut ws = Workspace::create(0, config()).unwrap();
        let before = ws.expires_at();
        ws.extend(10).unwrap();
        assert_eq!(ws.expires_at(), before + 10 * 60_000);

        ws.revoke(0);
        assert!(ws.extend(5).is_err());
    }

    #[test]
    fn expire_if_due_is_monotone() {
        let mut ws = Workspace::create(0, config()).unwrap();
        let expires_at = ws.expires_at();
        assert!(!ws.expire_if_due(expires_at - 1));
        assert!(ws.expire_if_due(expires_at));
        assert_eq!(ws.status, WorkspaceStatus::Expired);
        // already terminal: no further transition
        assert!(!ws.expire_if_due(expires_at + 1));
    }
}
