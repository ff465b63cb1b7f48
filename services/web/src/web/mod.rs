pub mod auth;
pub mod cookies;
pub mod device;
pub mod middleware;
pub mod pages;
pub mod rest;
pub mod router;
pub mod state;
pub mod templates;

// Re-export what the binaries need to build and describe the server.
pub use middleware::{page_gate, require_auth};
pub use rest::ApiDoc;
pub use router::build_router;
pub use state::AppState;
