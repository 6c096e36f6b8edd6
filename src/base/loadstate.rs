/// The lifecycle state of a transfer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Freshly created or reset; only default options applied.
    #[default]
    Created,

    /// At least one option has been set since creation or reset.
    Configured,

    /// Attached to a scheduler and progressing there.
    InFlight,

    /// The last transfer finished successfully.
    Performed,

    /// The last transfer failed.
    Failed,
}

impl LoadState {
    /// Whether a transfer has run since the last reset.
    pub fn has_transferred(&self) -> bool {
        matches!(self, LoadState::Performed | LoadState::Failed)
    }
}
