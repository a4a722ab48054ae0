pub mod analysis;
pub mod progress;
pub mod tree;
pub mod user;

pub use analysis::*;
pub use progress::*;
pub use tree::*;
pub use user::*;
