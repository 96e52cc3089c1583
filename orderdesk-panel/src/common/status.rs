/// Per-component operation flag a renderer uses to disable triggering
/// controls while work is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl OpStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, OpStatus::Loading)
    }
}
