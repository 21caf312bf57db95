pub mod aggregate;
pub mod bucket;
pub mod circular;
pub mod config;
pub mod engine;
pub mod influx;
pub mod interval;
pub mod output;
pub mod planner;
pub mod retry;
pub mod samples;
pub mod store;
pub mod tags;
