// SPDX-License-Identifier: MIT

//! fable-rs - an interactive, LLM-driven short story writer
//!
//! The crate is split in two layers:
//! - [`adk`] - the agent development kit: models, tools, shared state and
//!   the generation step contract
//! - [`fable`] - the story workflow: topic collection, drafting and the
//!   bounded critique/refine loop

pub mod adk;
pub mod fable;
