pub mod blueriiot;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod http;
pub mod measurement;
pub mod poller;
pub mod quality;
pub mod reading;
pub mod session;
pub mod sigv4;

#[cfg(test)]
pub mod test_support;
