pub mod stage;
pub mod task;

pub use stage::*;
pub use task::*;
