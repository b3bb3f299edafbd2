pub mod referral_code;
pub mod weighted;

pub use referral_code::{generate_referral_code, generate_unique_referral_code, is_valid_referral_code};
pub use weighted::pick_weighted_index;
