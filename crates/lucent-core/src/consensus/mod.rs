pub mod checkpoint;
pub mod domain;
pub mod period;
pub mod signature;
pub mod store;
pub mod validator;

pub use checkpoint::*;
pub use domain::*;
pub use period::*;
pub use signature::*;
pub use store::*;
pub use validator::*;
