mod auth;
mod store;

pub use auth::Session;
pub use store::CredentialStore;
pub use store::FileStore;
pub use store::MemoryStore;
