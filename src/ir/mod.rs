//! 中間表現

pub mod key_usage;
