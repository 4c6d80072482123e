//! Heuristics module for the p-center problem.
//!
//! This module exports the incremental assignment state, the swap
//! neighborhood, construction heuristics and the (parallel) tabu search.

pub mod assignment;
pub mod tabu;
pub mod neighborhood;
pub mod construction;
pub mod tabu_search;
pub mod parallel;

pub use assignment::*;
pub use tabu::*;
pub use neighborhood::*;
pub use construction::*;
pub use tabu_search::*;
pub use parallel::*;
