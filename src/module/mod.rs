//! Runnable modules containing each bundling multiple services and providing a unified configuration

pub mod options;

#[cfg(feature = "consumer")]
pub mod consumer;
#[cfg(feature = "producer")]
pub mod producer;
