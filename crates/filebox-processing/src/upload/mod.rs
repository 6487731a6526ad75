pub mod traits;

pub use traits::{RemoteScanner, TransportError};
