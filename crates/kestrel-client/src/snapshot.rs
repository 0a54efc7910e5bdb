use std::path::PathBuf;

use kestrel_core::util::query_slug;
use kestrel_core::{AppError, SnapshotSink};

/// Saves each fetched page as `<dir>/<site>_<query>.html`.
#[derive(Debug, Clone)]
pub struct DirSnapshotSink {
    dir: PathBuf,
    site: String,
}

impl DirSnapshotSink {
    /// Creates `dir` if it does not exist.
    pub fn new(dir: impl Into<PathBuf>, site: &str) -> Result<Self, AppError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            site: site.to_string(),
        })
    }

    fn path_for(&self, query: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.html", self.site, query_slug(query)))
    }
}

impl SnapshotSink for DirSnapshotSink {
    fn save(&self, query: &str, html: &str) -> Result<(), AppError> {
        let path = self.path_for(query);
        std::fs::write(&path, html)?;
        tracing::debug!("Saved page snapshot to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_page_under_query_slug() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirSnapshotSink::new(dir.path().join("pages"), "daraz").unwrap();

        sink.save("samsung smart tv", "<html>page</html>").unwrap();

        let saved = std::fs::read_to_string(dir.path().join("pages/daraz_samsung_smart_tv.html"))
            .unwrap();
        assert_eq!(saved, "<html>page</html>");
    }
}
