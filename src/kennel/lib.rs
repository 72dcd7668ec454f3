//! # Kennel Architecture
//!
//! Kennel manages the catalogue of a small breeder's showcase site. The whole
//! site lives in **one JSON document** kept in a GitHub repository: the
//! accounts, the animals and their pictures. Visitors read it through the
//! public raw mirror; administrators publish changes through the contents API,
//! guarded by the file's blob sha so concurrent writers cannot silently
//! overwrite each other.
//!
//! The hard part is not talking to GitHub, it is never losing the catalogue.
//! An earlier generation of the site wiped its data twice: once by publishing
//! an empty document over a full one, once by an automatic sync racing a
//! manual edit. Most of this crate exists to make those two failures
//! impossible.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, prompts, formats output                │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - One application context per process                      │
//! │  - Resolves the current actor, parses item ids              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Permission checks, validation, user-facing messages      │
//! │  - Returns `CmdResult`, never prints                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Repository + Sync (repository.rs, sync.rs, recovery.rs)    │
//! │  - Working copy, bootstrap admin, emergency snapshots       │
//! │  - Single-flight sync, auto-sync policy                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - StoreFacade: remote first, local fallback, save guards   │
//! │  - RemoteDocumentStore over a Transport (ureq or in-memory) │
//! │  - LocalSnapshotStore over a StorageBackend (fs or memory)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Safety Rules
//!
//! - An empty catalogue is never saved while any backup still holds items.
//! - Before every remote write the current remote is checked; if it holds more
//!   items than the copy being saved, a person decides which side wins.
//! - Writes carry the sha they were based on. A stale sha is a conflict, and a
//!   conflict is reported, never retried blindly.
//! - Every mutation that leaves items behind refreshes the emergency snapshot.
//! - Automatic sync is off unless configured, and never runs concurrently with
//!   a manual one.
//!
//! ## Testing Strategy
//!
//! The core runs against [`store::mem_remote::MemContentsApi`], an in-memory
//! imitation of the GitHub contents API (shas, 409/422 conflicts, large-file
//! blob fallback), and [`store::mem_backend::MemBackend`]. Command modules
//! carry the bulk of the tests; `tests/` drives the binary end to end in
//! local-only mode.
//!
//! ## Module Overview
//!
//! - [`api`]: application context facade
//! - [`commands`]: business logic per command
//! - [`config`]: `config.json` handling
//! - [`credentials`]: the GitHub token
//! - [`init`]: production wiring and data directory
//! - [`model`]: wire types of the shared document
//! - [`prompt`]: human decisions behind a trait
//! - [`recovery`]: last known good copy, emergency snapshot, local mirror
//! - [`repository`]: the working copy
//! - [`session`]: the logged-in user
//! - [`store`]: remote and local persistence
//! - [`sync`]: coordinator and auto-sync policy

pub mod api;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod init;
pub mod model;
pub mod prompt;
pub mod recovery;
pub mod repository;
pub mod session;
pub mod store;
pub mod sync;
