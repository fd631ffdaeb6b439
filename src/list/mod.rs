//! Paginated, searchable user list driven by connectivity.

mod actor;
mod state;

pub use actor::{spawn, UserListHandle};
pub use state::ListState;
