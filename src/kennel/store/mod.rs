//! # Storage Layer
//!
//! Two stores hold the [`Document`](crate::model::Document):
//!
//! - [`remote::RemoteDocumentStore`]: the shared copy, one JSON file in a
//!   GitHub repository, read by every visitor and written by administrators
//!   holding a token.
//! - [`local::LocalSnapshotStore`]: the same-device copy plus the emergency
//!   snapshot, always available.
//!
//! [`facade::StoreFacade`] picks between them and owns the write-time loss
//! protection.
//!
//! ## Seams
//!
//! Both stores sit on a small trait so they can run without a disk or a
//! network:
//!
//! - [`backend::StorageBackend`]: string values by key.
//!   [`fs_backend::FsBackend`] keeps one file per key in the data directory;
//!   [`mem_backend::MemBackend`] keeps a map.
//! - [`transport::Transport`]: HTTP GET and PUT.
//!   [`transport::UreqTransport`] goes to GitHub;
//!   [`mem_remote::MemContentsApi`] emulates the contents API in memory.
//!
//! ## Storage Format
//!
//! ```text
//! {data_dir}/
//! ├── kennel_data.json              # local mirror of the document
//! ├── kennel_emergency_backup.json  # last non-empty state, with timestamp
//! ├── kennel_session.json           # logged-in user
//! ├── github_token.json             # write credential
//! └── config.json                   # settings
//! ```

pub mod assets;
pub mod backend;
pub mod facade;
pub mod fs_backend;
pub mod local;
pub mod mem_backend;
pub mod mem_remote;
pub mod remote;
pub mod transport;
