pub mod config;
pub mod error;
pub mod komoot_client;
pub mod logging;
pub mod strava_client;
#[cfg(test)]
mod test_server;
pub mod types;
