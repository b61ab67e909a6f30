mod handlers;
mod server;
mod services;

pub use handlers::build_handler_chain;
pub use server::build_server;
pub use services::DnsServices;
