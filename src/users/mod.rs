//! User records and the fetch / cache / fallback pipeline that produces them.

pub mod api_types;
pub mod local;
pub mod remote;
pub mod repository;
pub mod types;
pub mod use_case;

pub use local::StoredUserCache;
pub use remote::HttpRemoteSource;
pub use repository::CachedUserRepository;
pub use types::User;
pub use use_case::{FetchUsers, FetchUsersUseCase};
