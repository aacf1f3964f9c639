// Draft domain: session lifecycle, turn resolution, pick log, personal queue.

pub mod queue;
pub mod session;
pub mod store;
pub mod turn;
