//! Modules bundled with modman

mod project;
mod workfiles;

pub use project::{PROJECT_NAME_VAR, PROJECT_ROOT_VAR, ProjectModule};
pub use workfiles::{EXTENSIONS_VAR, WORKDIR_VAR, WorkfilesModule};
