//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer stack)
//!     → request.rs (request ID, context, client identity)
//!     → [security + validation middleware]
//!     → [route handler]
//!     → response.rs (before-send stages: headers, timing)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ClientIdentity, IdentityExtractor, RequestContext, RequestUuid, X_REQUEST_ID};
pub use response::{now_iso8601, ResponsePolicy, ResponseStage, X_RESPONSE_TIME};
pub use server::{AppState, HttpServer};
