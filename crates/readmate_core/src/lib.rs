pub mod controllers;
pub mod domain;
pub mod ports;
pub mod routing;
pub mod session;
pub mod view_model;

pub use domain::{AuthSession, Book, BookStatus, NewBook, Theme, User, UserCredentials, ValidationError};
pub use ports::{
    AuthError, AuthResult, BookRepository, DeviceStorage, FederatedCallback, IdentityProvider,
    StoreError, StoreResult,
};
pub use session::{SessionManager, SessionState};
pub use view_model::{BookQuery, BookStats, SortKey, StatusFilter};
