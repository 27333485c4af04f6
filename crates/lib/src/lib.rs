//! buildgen-lib: build-file generation for native C and C++ projects
//!
//! This crate turns a description of what to build into a Makefile:
//! - `toolchain`: compiler detection and typed compile/link options
//! - `packages`: external dependency resolution (pkg-config, path search)
//! - `make`: an escaping-aware Makefile document model
//! - `generate`: the build graph and its translation to Make rules

pub mod execute;
pub mod generate;
pub mod make;
pub mod packages;
pub mod path;
pub mod platform;
pub mod safe_str;
pub mod shell;
pub mod toolchain;
pub mod versioning;
