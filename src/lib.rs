pub mod board;
pub mod config;

pub use board::Board;
pub use config::BoardConfig;
