//! Everything that touches the outside world: USB, pipes, log sinks.

pub mod channel;
pub mod device;
pub mod logging;
