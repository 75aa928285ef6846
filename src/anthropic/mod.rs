mod claude;
pub use claude::*;
