//! repocensus - contributor and file-level statistics for git repositories
//!
//! Collects a snapshot dataset for a repository's HEAD: the commit history
//! with per-commit line stats, a blame summary per tracked file and totals
//! per contributor. Datasets are cached per HEAD commit and can be rendered
//! as HTML or JSON reports.

pub mod cache;
pub mod cli;
pub mod collector;
pub mod config;
pub mod git;
pub mod models;
pub mod reporters;
