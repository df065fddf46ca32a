mod database {
    pub mod actions;
    pub mod connection;
    pub mod error;
    pub mod form;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
}
mod storage {
    pub mod media;
}
pub mod routes {
    pub mod attributes;
    pub mod docs;
    pub mod favorites;
    pub mod filters;
    pub mod media;
    pub mod recipes;
    pub mod users;
}
pub mod config;
mod constants;
pub mod server;
pub mod state;

pub use authentication::*;
pub use constants::*;
pub use database::*;
pub use routes::docs;
pub use storage::*;
