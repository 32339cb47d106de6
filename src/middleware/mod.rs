/// Middleware module
///
/// The request gate for protected routes and request logging.

mod request_gate;
mod request_logger;

pub use request_gate::{authenticate, bearer_token, AuthenticatedUser, RequestGate};
pub use request_logger::{RequestLogger, REQUEST_ID_HEADER};
