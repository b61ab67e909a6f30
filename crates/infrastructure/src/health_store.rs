use dashmap::DashMap;

use fleet_dns_application::ports::InstanceHealth;
use fleet_dns_domain::HealthState;

/// Concurrent health table keyed by instance IP.
///
/// The health monitor writes, in-flight queries read. Instances never
/// observed by the monitor stay [`HealthState::Unknown`] and remain
/// answerable.
#[derive(Debug, Default)]
pub struct InstanceHealthTable {
    states: DashMap<String, HealthState>,
}

impl InstanceHealthTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, ip: &str, state: HealthState) {
        self.states.insert(ip.to_string(), state);
    }

    pub fn forget(&self, ip: &str) {
        self.states.remove(ip);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl InstanceHealth for InstanceHealthTable {
    fn state_of(&self, ip: &str) -> HealthState {
        self.states
            .get(ip)
            .map(|entry| *entry.value())
            .unwrap_or(HealthState::Unknown)
    }
}
