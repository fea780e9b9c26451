//! Inbound message dispatch.

mod dispatcher;

pub use dispatcher::Dispatcher;
