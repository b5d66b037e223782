//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`fs`] - temporary paths, scoped cleanup, moving and copying trees
//! - [`platform`] - operating system and architecture names
//! - [`progress`] - terminal rendering of an update's state

pub mod fs;
pub mod platform;
pub mod progress;

pub use fs::{ScopedPath, copy_path, create_unique_temp_dir, move_path, unique_temp_path};
pub use platform::{is_macos, is_windows};
pub use progress::{ProgressStyle, UpdateProgress};
