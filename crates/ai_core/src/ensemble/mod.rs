//! Tree ensembles for binary potability classification
//!
//! - **Trees** are flat node arrays, traversed with `value <= threshold`
//!   going left.
//! - **Random forest** leaves hold a positive-class rate; the forest
//!   averages them.
//! - **Boosted trees** accumulate log-odds steps on top of a prior and pass
//!   the sum through a sigmoid.
//! - **Voting ensemble** averages member probabilities (soft voting).
//!
//! All types are plain serde data so a fitted ensemble can be written to
//! and read back from the model store unchanged.

pub mod tree;
pub mod voting;

pub use tree::{Node, Tree};
pub use voting::{sigmoid, BoostedTrees, EnsembleMember, RandomForest, VotingEnsemble};
