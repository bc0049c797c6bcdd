pub mod member;
pub mod user;

pub use member::*;
pub use user::*;
