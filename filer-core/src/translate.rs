use std::path::{Path, PathBuf};

const ARCHIVE_MARKERS: &[&str] = &["/Archive/", "/Archive_PN/"];
const ORIGINAL_MARKER: &str = "/__BACKUP/";

/// Maps paths reported by update producers onto the local filesystem.
///
/// Producers may send Windows paths from the archive share; those are
/// re-rooted under the configured local mounts. Only paths below `base_dir`
/// are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTranslator {
    base_dir: PathBuf,
    archive_base: String,
    original_base: String,
}

impl Default for PathTranslator {
    fn default() -> Self {
        Self::new("/", "", "")
    }
}

impl PathTranslator {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        archive_base: impl Into<String>,
        original_base: impl Into<String>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            archive_base: archive_base.into(),
            original_base: original_base.into(),
        }
    }

    pub fn translate(&self, raw: &str) -> String {
        let path = raw.replace('\\', "/");

        for marker in ARCHIVE_MARKERS {
            if let Some(idx) = path.find(marker) {
                return format!("{}{}", self.archive_base, &path[idx..]);
            }
        }
        if let Some(idx) = path.find(ORIGINAL_MARKER) {
            return format!("{}{}", self.original_base, &path[idx..]);
        }
        path
    }

    /// Translated path, or `None` when it falls outside `base_dir`.
    pub fn resolve(&self, raw: &str) -> Option<PathBuf> {
        let translated = PathBuf::from(self.translate(raw));
        translated
            .starts_with(&self.base_dir)
            .then_some(translated)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> PathTranslator {
        PathTranslator::new("/net", "/net/server/b", "/net/server/original")
    }

    #[test]
    fn archive_paths_are_rerooted() {
        let t = translator();
        assert_eq!(
            t.translate(r"\\srv\share\Archive\2020\a.mp4"),
            "/net/server/b/Archive/2020/a.mp4"
        );
        assert_eq!(
            t.translate("d:/Archive_PN/x/a.mp4"),
            "/net/server/b/Archive_PN/x/a.mp4"
        );
        assert_eq!(
            t.translate(r"d:\__BACKUP\a.mp4"),
            "/net/server/original/__BACKUP/a.mp4"
        );
    }

    #[test]
    fn other_paths_only_get_slashes_normalized() {
        assert_eq!(translator().translate("/mnt/001/a.mp4"), "/mnt/001/a.mp4");
    }

    #[test]
    fn resolve_enforces_base_dir() {
        let t = translator();
        assert_eq!(
            t.resolve(r"x:\Archive\a.mp4"),
            Some(PathBuf::from("/net/server/b/Archive/a.mp4"))
        );
        assert_eq!(t.resolve("/mnt/001/a.mp4"), None);
        assert_eq!(t.resolve("/network/a.mp4"), None);
        assert!(PathTranslator::default().resolve("/mnt/001/a.mp4").is_some());
    }
}
