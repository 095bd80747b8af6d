pub mod rate_limit;
#[cfg(feature = "serde")]
pub(crate) mod serde;
