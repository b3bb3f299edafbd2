pub mod entry;
pub mod giveaway;
pub mod pagination;
pub mod tier;
pub mod webhook;
pub mod winner;

pub use entry::*;
pub use giveaway::*;
pub use pagination::*;
pub use tier::*;
pub use webhook::*;
pub use winner::*;
