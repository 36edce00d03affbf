//! Logic common to multiple IOPs.
pub mod channel;
