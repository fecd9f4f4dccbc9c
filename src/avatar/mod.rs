pub mod cache;
pub mod providers;

pub use cache::AvatarCache;
pub use providers::{AvatarProvider, HttpAvatarProvider};
