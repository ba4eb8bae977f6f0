//! Shared scenario-test harness. Each `[[test]]` binary depends on this
//! crate and pulls in [`common`] for the fixtures scenario tests share.

pub mod common;
