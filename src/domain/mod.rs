//! Hardware-independent types: the canonical frame, the report codec,
//! settings and counters.

pub mod codec;
pub mod models;
pub mod settings;
pub mod stats;
