use std::sync::Arc;

use tracing::{info, warn};

use fleet_dns_application::ports::{Clock, DomainResolver, RecordSource};
use fleet_dns_application::{LocalDomainResolver, RandomAnswerShuffler};
use fleet_dns_domain::Config;
use fleet_dns_infrastructure::{
    FileRecordSource, InstanceHealthTable, StaticRecordSource, SystemClock,
};

/// Shared collaborators behind the handler chain.
pub struct DnsServices {
    pub resolver: Arc<dyn DomainResolver>,
    pub clock: Arc<dyn Clock>,
}

impl DnsServices {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let record_source: Arc<dyn RecordSource> = match &config.records_file {
            Some(path) => {
                info!(path = %path, "Loading instance records");
                Arc::new(FileRecordSource::open(path, &config.local_domain).await?)
            }
            None => {
                warn!("No records file configured, serving without instance records");
                Arc::new(StaticRecordSource::empty())
            }
        };

        let health_table = Arc::new(InstanceHealthTable::new());
        let resolver = Arc::new(LocalDomainResolver::new(
            record_source,
            health_table,
            Arc::new(RandomAnswerShuffler::new()),
        ));

        Ok(Self {
            resolver,
            clock: Arc::new(SystemClock::new()),
        })
    }
}
