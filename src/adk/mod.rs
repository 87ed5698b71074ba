// SPDX-License-Identifier: MIT

//! Agent development kit
//!
//! Framework plumbing shared by every workflow step:
//! - [`model`] - LLM backend trait and the OpenAI-compatible client
//! - [`tool`] - callable actions offered to the model
//! - [`state`] - the shared workflow state and its visibility policy
//! - [`step`] - the generation step contract
//! - [`error`] - typed errors for the layers above

pub mod error;
pub mod model;
pub mod state;
pub mod step;
pub mod tool;
