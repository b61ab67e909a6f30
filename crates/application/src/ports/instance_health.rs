use fleet_dns_domain::HealthState;

/// Port for querying per-instance liveness, keyed by instance ip.
pub trait InstanceHealth: Send + Sync {
    fn state_of(&self, ip: &str) -> HealthState;
}
