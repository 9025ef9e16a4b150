pub mod dap;
pub mod debugger;
pub mod error;
pub mod parser;
pub mod transport;

pub use error::{BridgeError, Result};
