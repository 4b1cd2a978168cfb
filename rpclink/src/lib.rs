//! JSON-RPC 2.0 client runtime.
//!
//! The transport-agnostic core (the [`Client`], interceptors, deadlines and errors) is always
//! available.  The concrete HTTP and socket transports, and building a client from configuration,
//! come with the `client` feature, which is on by default.
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use rpclink::transport::HttpTransport;
//!
//! let transport = HttpTransport::new("http://localhost:8545".parse()?)?;
//! let client = rpclink::Client::builder(transport).build();
//!
//! let block_number: String = client.call_method("eth_blockNumber", ()).await?;
//! # Ok(())
//! # }
//! ```

pub use rpclink_jsonrpc::*;

#[cfg(feature = "client")]
pub mod transport {
    //! Transports for HTTP, TCP, WebSocket and local IPC
    pub use rpclink_client::*;
}

#[cfg(feature = "client")]
pub use rpclink_client::{ClientConfig, TransportConfig};
