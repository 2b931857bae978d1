use std::path::{Path, PathBuf};

/// well known locations inside a site directory
#[derive(Clone, Debug)]
pub struct SiteDirs {
    pub config_path: PathBuf,
    pub template_dir: PathBuf,
}

impl SiteDirs {
    pub fn new(directory: &Path) -> Self {
        Self {
            config_path: directory.join("site.json"),
            template_dir: directory.join("templates"),
        }
    }
}
