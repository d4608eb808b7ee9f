//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → dispatcher.rs (special paths, routing, cache, upstream)
//!     → response.rs (sanitized upstream or fixed responses)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::Dispatcher;
pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::HttpServer;
