use std::fmt;

use serde::{Deserialize, Serialize};

/// Host lifecycle events a hook can be registered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HookEvent {
    PreToolUse,
    PostToolUse,
    Stop,
    SubagentStop,
    UserPromptSubmit,
    Notification,
    SessionStart,
    SessionEnd,
    PreCompact,
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl HookEvent {
    /// All variants, for iteration.
    pub const ALL: &'static [HookEvent] = &[
        Self::PreToolUse,
        Self::PostToolUse,
        Self::Stop,
        Self::SubagentStop,
        Self::UserPromptSubmit,
        Self::Notification,
        Self::SessionStart,
        Self::SessionEnd,
        Self::PreCompact,
    ];

    /// Exact, case-sensitive event name as the host spells it.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.to_string() == name)
    }

    /// Stop-class events end a turn; blocking them keeps the session going.
    pub fn is_stop_class(&self) -> bool {
        matches!(self, Self::Stop | Self::SubagentStop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_display() {
        for event in HookEvent::ALL {
            assert_eq!(HookEvent::from_name(&event.to_string()), Some(*event));
        }
        assert_eq!(HookEvent::from_name("pretooluse"), None);
    }
}
