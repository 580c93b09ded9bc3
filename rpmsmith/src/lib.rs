//! rpmsmith - rebuild modified RPM packages
//!
//! A package repository carries an `rpmsmith.yaml` manifest describing one
//! or more packages, where their upstream sources live and how to build
//! them. rpmsmith fetches and verifies those sources, produces a source RPM
//! with `rpmbuild`, then rebuilds binary RPMs inside a `mock` chroot.
//!
//! ## Pipelines
//!
//! - **SRPM** ([`srpm::SrpmBuilder`]): clean, fetch, verify, set up the
//!   rpmbuild tree, prep, build the SRPM, publish it.
//! - **Mock** ([`mock_build::MockBuilder`]): locate the SRPM, render a mock
//!   config from DNF repo bundles, init, install deps, rebuild, publish.
//!
//! Every external tool runs through an [`executor::Executor`], so the same
//! pipeline can run for real, as a dry-run script, or against scripted
//! results in tests.

pub mod cli;
pub mod commands;
pub mod config;
pub mod dnfconfig;
pub mod error;
pub mod executor;
pub mod git;
pub mod manifest;
pub mod mock_build;
pub mod mock_cfg;
pub mod output;
pub mod pipeline;
pub mod srcconfig;
pub mod srpm;
pub mod template;
pub mod verify;

pub use cli::{Cli, Commands};
pub use config::Config;
