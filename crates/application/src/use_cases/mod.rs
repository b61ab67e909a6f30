mod resolve_local_domain;

pub use resolve_local_domain::LocalDomainResolver;
