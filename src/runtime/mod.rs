pub mod ticker;

pub use ticker::{IdleTick, IdleTicker};
