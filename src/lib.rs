//! Ward audit library surface.
//!
//! Discovers every account that can influence a set of root contracts through
//! owner/authority delegation, `wards` authorization and `bud` whitelisting,
//! then renders the control hierarchy and diffs it against the previous run.
//!
//! Data flow: [`registry`] (names) -> [`builder`] (BFS) -> [`prober`] per
//! address, fed by [`signals`] and [`history`] -> [`render`] -> [`snapshot`].

pub mod address;
pub mod audit;
pub mod builder;
pub mod cache;
pub mod chain;
pub mod error;
pub mod graph;
pub mod history;
pub mod prober;
pub mod publish;
pub mod registry;
pub mod render;
pub mod signals;
pub mod snapshot;

pub mod utils {
    pub mod config;
    pub mod error;
}
