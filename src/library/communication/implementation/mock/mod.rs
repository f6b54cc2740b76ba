mod consumer;
mod coordinator;
mod factory;
mod log;

pub use consumer::*;
pub use coordinator::*;
pub use factory::*;
pub use log::*;

