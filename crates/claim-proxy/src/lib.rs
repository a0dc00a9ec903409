//! # claim-proxy
//!
//! Stateless backend proxy for NIGHT claims. Forwards allocation queries and
//! signed consolidation requests to the remote settlement service and
//! translates its status codes for the browser client.

mod error;
pub mod routes;
mod server;
pub mod settlement;

pub use error::ProxyError;
pub use routes::router;
pub use server::ProxyServer;
pub use settlement::{RemoteReply, SettlementClient};
