pub mod entry_service;
pub mod giveaway_service;
pub mod subscription_service;
pub mod tier_service;
pub mod winner_service;


pub use entry_service::*;
pub use giveaway_service::GiveawayService;
pub use subscription_service::*;
pub use tier_service::*;
pub use winner_service::*;
