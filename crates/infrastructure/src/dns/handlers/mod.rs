mod alias_resolving;
mod discovery;
mod forward;
mod request_logger;
mod upcheck;

pub use alias_resolving::{AliasResolvingHandler, NotReducedError};
pub use discovery::DiscoveryHandler;
pub use forward::ForwardHandler;
pub use request_logger::RequestLoggerHandler;
pub use upcheck::UpcheckHandler;
