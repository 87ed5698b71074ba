// SPDX-License-Identifier: MIT

//! The story workflow
//!
//! Topic collection -> initial draft -> critique/refine loop, wired from a
//! YAML workflow definition.

pub mod builder;
pub mod collect;
pub mod config;
pub mod error;
pub mod events;
pub mod input;
pub mod pipeline;
pub mod refine;
pub mod report;
pub mod topic;
