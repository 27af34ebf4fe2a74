//! Repository fetching: clone, pull, remote change detection, commit info,
//! and hosting-API metadata.

mod clone;
pub mod metadata;

pub use clone::{check_for_updates, clone_repo, last_commit, pull_repo, remove_dir_force, RemoteStatus};
