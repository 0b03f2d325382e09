//! Contract with the chat assistant: validate proposed nodes against the
//! method registry and materialize accepted ones.

pub mod proposal;

pub use proposal::{
    materialize, node_with_defaults, validate_proposals, Proposal, ProposalError, ProposalReport,
    ProposedParams,
};
