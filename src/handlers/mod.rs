pub mod entry;
pub mod giveaway;
pub mod tier;
pub mod webhook;
pub mod winner;

pub use entry::entry_config;
pub use giveaway::giveaway_config;
pub use tier::tier_config;
pub use webhook::webhook_config;
pub use winner::winner_config;
