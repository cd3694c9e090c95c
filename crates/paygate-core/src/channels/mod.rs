//! Bank channel implementations

pub mod alfabank;
