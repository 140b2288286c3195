mod auth;
mod origin;
mod reqwest;
mod rewrite;
mod store;
mod trace;

pub use auth::*;
pub use origin::*;
pub use reqwest::*;
pub use rewrite::*;
pub use store::*;
pub use trace::*;
