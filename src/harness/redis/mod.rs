mod factory;
mod resource;

pub use factory::{RedisCommunicationFactory, SharedRedisFactory};
