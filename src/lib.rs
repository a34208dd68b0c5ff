pub mod common;
pub mod tour_sync;
