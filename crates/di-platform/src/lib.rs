mod commands;
mod paths;
mod search_path;

pub use commands::HideWindow;
pub use paths::{AppPaths, AppPathsError, default_install_dir, runtime_cache_dir};
pub use search_path::{SearchPath, executable_extension, locate_executable, locate_file};
