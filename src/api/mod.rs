pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod realtime;
pub mod router;
