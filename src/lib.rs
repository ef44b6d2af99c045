pub mod clock;
pub mod config;
pub mod journal;
pub mod limits;
pub mod market;
pub mod model;
pub mod notify;
pub mod observability;
pub mod store;
pub mod sweeper;
pub mod timeline;
