pub mod binning;
pub mod chain;
pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod invariant;
pub mod io;
pub mod kernel;
pub mod ordering;
pub mod pipeline;
pub mod rarity;
pub mod simplex;
pub mod window;
