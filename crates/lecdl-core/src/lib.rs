pub mod config;
pub mod logging;

pub mod cache;
pub mod capture;
pub mod correlate;
pub mod course;
pub mod fetch;
pub mod http;
pub mod media;
pub mod naming;
pub mod pipeline;
pub mod playlist;
pub mod protocol;
pub mod publish;
pub mod scraper;
pub mod storage;
