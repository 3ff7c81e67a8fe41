use serde::Serialize;

/// Observable lifecycle state of a holder.
///
/// `Absent → Constructing → Present`, with `Constructing → Absent` on a
/// failed attempt. `Present` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HolderState {
    /// No instance, no attempt in flight.
    Absent,
    /// No instance yet; some thread holds the guard.
    Constructing,
    /// The instance is published.
    Present,
}

impl HolderState {
    /// Returns `true` for the terminal state.
    #[inline]
    pub fn is_present(self) -> bool {
        self == HolderState::Present
    }
}

impl core::fmt::Display for HolderState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            HolderState::Absent => "absent",
            HolderState::Constructing => "constructing",
            HolderState::Present => "present",
        })
    }
}
