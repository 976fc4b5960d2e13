//! # dbgraph
//!
//! Commit graph, branch, tag and release management for versioned SQLite
//! databases.
//!
//! Every upload of a database becomes an immutable, content-addressed
//! commit. Branches are mutable pointers to a head commit; tags and releases
//! are immutable pointers. All of it is stored as whole documents in a
//! pluggable [`DocumentStore`](store::DocumentStore).
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use dbgraph::{Actor, Engine, MemoryStore, RepoId, Result, Upload};
//!
//! fn main() -> Result<()> {
//!     let engine = Engine::new(Arc::new(MemoryStore::new()));
//!     let ann = Actor::new("ann", "Ann Example", "ann@example.org");
//!
//!     let repo = engine.init(RepoId::new("ann", "birds.sqlite"), Upload::new("birds.sqlite", b"v1"), &ann)?;
//!     let second = repo.commit_upload("master", Upload::new("birds.sqlite", b"v2"), &ann)?;
//!     repo.create_tag("v2", &second, "second survey", &ann)?;
//!
//!     for commit in repo.history("master")? {
//!         println!("{} {}", commit.id().short(), commit.summary());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`error`] - Error types and Result alias
//! - [`repository`] - `Engine` and the per-database `Repository` handle
//! - [`merge`] - Cross-repository ancestor resolution and merging
//! - [`objects`] - Content-addressed commits and trees
//! - [`refs`] - Branches, tags and releases
//! - [`log`] - Ancestry walking
//! - [`store`] - Document stores and collaborator interfaces
//! - [`config`] - Engine configuration

pub mod config;
pub mod error;
pub mod log;
pub mod merge;
pub mod objects;
pub mod refs;
pub mod repository;
pub mod store;

// Internal modules (not part of public API)
pub(crate) mod infra;

// Re-export primary types for convenient access
pub use config::{EngineConfig, MergeStrategy};
pub use error::{Error, ErrorKind, Result};
pub use repository::{Actor, Engine, Repository, Upload};

/// Computes the SHA-256 content hash of `data`.
pub use infra::hash::sha256;

// Re-export object types
pub use objects::{Commit, CommitMap, Oid, Signature, Tree, TreeEntry};

// Re-export reference types
pub use refs::{Branch, Release, Tag};

// Re-export store types
pub use store::{DocumentStore, FileStore, MemoryStore, RepoId};

// Re-export merge types
pub use merge::{AncestorResult, MergeOutcome};
