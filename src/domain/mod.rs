pub mod user;
pub mod student;
pub mod audience;
pub mod announcement;
pub mod email;

pub use user::*;
pub use student::*;
pub use audience::*;
pub use announcement::*;
pub use email::*;
