//! Influencer program: influencers, applications, attributions and payouts.

mod attribution;
pub mod influencer;
pub mod payout;

pub(crate) use attribution::insert_attribution;
pub use influencer::InfluencerRepository;
pub use payout::PayoutRepository;
