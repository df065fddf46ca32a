pub mod attributes;
pub mod favorites;
pub mod recipes;
pub mod users;

pub use attributes::*;
pub use favorites::*;
pub use recipes::*;
pub use users::*;
