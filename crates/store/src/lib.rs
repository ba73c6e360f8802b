pub mod error;
pub mod users;

pub use error::{Result, StoreError};
pub use users::UserStore;
