mod reqwest_response;

pub use reqwest_response::*;
