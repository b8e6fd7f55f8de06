//! dee-proto — scenario result schema and steganographic carriers for the
//! lab server and CLI demos. No cryptographic logic lives here; it only
//! shapes `dee-crypto` output for transport.

pub mod scenario;
pub mod stego;

pub use scenario::ScenarioResult;
pub use stego::{Carrier, StegoError};
