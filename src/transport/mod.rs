// Transport module - THE WIRE
// TCP sockets carrying length-prefixed frames

mod config;
mod framing;
mod tcp;

pub use config::{TcpTransportConfig, TransportError, DEFAULT_MAX_FRAME_BYTES};
pub use framing::{encode_frame, write_frame, FrameError, FrameReader, LENGTH_PREFIX_BYTES};
pub use tcp::{bind, configure, connect};
