pub mod error_handling;
pub mod guards;
pub mod logging;

pub use guards::{token_from_request, AuthUser};
pub use logging::RequestSpan;
