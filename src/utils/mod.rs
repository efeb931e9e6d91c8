pub mod chain_normalizer;
pub mod ss58;
pub mod time_utils;
