pub mod aggregator;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod geocode;
pub mod output;
pub mod session;
pub mod view;
