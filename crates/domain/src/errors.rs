use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DnsError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Failed to encode DNS message: {0}")]
    MessageEncoding(String),

    #[error("Failed to decode DNS message: {0}")]
    MessageDecoding(String),

    #[error("Query timeout")]
    QueryTimeout,

    #[error("Upstream exchange failed: {0}")]
    Upstream(String),
}
