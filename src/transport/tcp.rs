// TCP Transport
// Binding, dialing and socket setup for peer connections

use crate::transport::{TcpTransportConfig, TransportError};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

/// Bind the listening socket described by `config`
pub async fn bind(config: &TcpTransportConfig) -> Result<TcpListener, TransportError> {
    let address = format!("{}:{}", config.bind_address, config.bind_port);
    TcpListener::bind(&address)
        .await
        .map_err(|e| TransportError::BindFailed {
            address,
            reason: e.to_string(),
        })
}

/// Dial a peer, giving up after the configured connect timeout
pub async fn connect(
    host: &str,
    port: u16,
    config: &TcpTransportConfig,
) -> Result<TcpStream, TransportError> {
    let address = format!("{}:{}", host, port);

    let stream = timeout(config.connect_timeout(), TcpStream::connect(&address))
        .await
        .map_err(|_| TransportError::Timeout(address.clone()))?
        .map_err(|e| TransportError::ConnectionFailed {
            address: address.clone(),
            reason: e.to_string(),
        })?;

    configure(&stream, config);
    Ok(stream)
}

/// Apply socket options to an accepted or dialed stream
pub fn configure(stream: &TcpStream, config: &TcpTransportConfig) {
    stream.set_nodelay(config.nodelay).ok();
}
