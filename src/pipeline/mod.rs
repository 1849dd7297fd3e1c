pub mod backoff;
pub mod handler;
pub mod handlers;
pub mod pool;

pub use backoff::*;
pub use handler::*;
pub use handlers::*;
pub use pool::*;
