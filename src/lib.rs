pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;

pub mod cache;
pub mod identity;
pub mod repositories;

pub mod crypto {
    pub mod channel;
    pub mod digest;
    pub mod registry;
}

pub mod models {
    pub mod client;
    pub mod session;
    pub mod user;
}

pub mod services {
    pub mod authorization;
    pub mod client;
    pub mod liveness;
    pub mod session;
}

pub mod handlers {
    pub mod admin;
    pub mod client;
    pub mod common;
}

pub mod validation {
    pub mod client;
}
