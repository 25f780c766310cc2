mod transport;

pub use transport::{ConnectionInfo, FramedTransport, TcpTransport, Transport};
