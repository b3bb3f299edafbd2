pub mod identity;
pub mod webhook_signature;

pub use identity::*;
pub use webhook_signature::*;
