/// Liveness of a single instance address as reported by the health
/// monitor. Instances start out `Unknown` until the first report lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Unhealthy,
    Unknown,
}

impl HealthState {
    /// Whether an address in this state may appear in DNS answers.
    /// Unknown instances are answered; only a confirmed failure excludes.
    pub fn is_answerable(&self) -> bool {
        !matches!(self, HealthState::Unhealthy)
    }
}
