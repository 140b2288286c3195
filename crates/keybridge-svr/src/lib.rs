pub mod middlewares;
pub mod router;
pub mod utils;
