pub mod handlers;
pub mod middleware;
pub mod prefetch;
pub mod resolve;
pub mod routes;

pub use routes::create_router;
