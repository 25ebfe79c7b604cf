mod admission;
mod state;
mod ticker;
mod waiter;

pub use state::{Limit, Limits};

pub(crate) use state::Flow;
