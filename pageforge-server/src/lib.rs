//! pageforge: brief in, published page out.
//!
//! A small HTTP service driven by a grading harness. Each build request runs a
//! linear pipeline:
//! - generate a single-file page from the brief with an LLM
//! - resolve (or create) the target repository
//! - publish the page, README and LICENSE with git
//! - ask the repository host to serve it as a static site (advisory)
//! - report the result to the evaluator with bounded retry (advisory)

pub mod config;
pub mod error;
pub mod generator;
pub mod git;
pub mod github;
pub mod hosting;
pub mod llm;
pub mod model;
pub mod notifier;
pub mod orchestrator;
pub mod publisher;
pub mod resolver;
pub mod web;
