//! Incremental build orchestration.
//!
//! A small task graph that fetches remote archives, extracts them safely,
//! copies generated artifacts, and verifies build outputs via content
//! hashes, skipping work whose recorded state still matches the file
//! system.
//!
//! # Example
//!
//! ```no_run
//! use kindling::{BuildConfig, ConfigChanged, PathSpec, Task, TaskGraph};
//!
//! let config = BuildConfig::new("/proj", "/proj/build")
//!     .value("version", "2.20");
//!
//! let url = "https://example.com/tarball/app-2.20.tar.gz";
//! let tasks = vec![
//!     Task::new("app", "fetch")
//!         .uptodate(ConfigChanged::new(url))
//!         .func({
//!             let url = url.to_string();
//!             move |c| Ok(kindling::fetch(&url, &c.build_dir.join("app.tar.gz"))?)
//!         })
//!         .target(PathSpec::literal("build/app.tar.gz")),
//!     Task::new("app", "extract")
//!         .file_dep(PathSpec::task_ref("app:fetch"))
//!         .func(|c| {
//!             Ok(kindling::extract(
//!                 &c.build_dir.join("app.tar.gz"),
//!                 &c.build_dir.join("app-src"),
//!             )?)
//!         })
//!         .task_dep("app:fetch"),
//! ];
//!
//! let graph = TaskGraph::new(config, tasks)?;
//! let summary = graph.run_all()?;
//! assert!(summary.all_ok());
//! # Ok::<(), kindling::Error>(())
//! ```

mod config;
mod copy;
mod error;
mod expand;
mod extract;
mod fetch;
mod fs_utils;
mod graph;
mod hash;
pub mod output;
mod shell;
mod state;
mod stub;
mod task;

pub use config::BuildConfig;
pub use copy::copy;
pub use error::{Error, Result};
pub use expand::{Expander, PathSpec};
pub use extract::extract;
pub use fetch::fetch;
pub use fs_utils::{create_folder, ensure_parent_dir};
pub use graph::{RunOutcome, RunSummary, TaskGraph};
pub use hash::{hash_file, hash_manifest};
pub use shell::ShellCmd;
pub use state::{Fingerprint, StateStore, TaskSignature};
pub use stub::{write_asset_stub, AssetStub};
pub use task::{Action, ConfigChanged, Registry, Task, TaskFactory, TaskId};
