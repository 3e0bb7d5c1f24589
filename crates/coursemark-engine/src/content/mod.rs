use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Substituted for the course text when the content backend cannot be
/// reached. Rendering this instead of crashing keeps the reading view alive.
pub const LOAD_FAILED_DOCUMENT: &str = "# Load failed\n\n\
    The course content could not be fetched. Check your connection or \
    contact an administrator.";

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("course {0} not found")]
    NotFound(u64),
    #[error("content backend timed out after {0:?}")]
    Timeout(Duration),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw course text in and out.
///
/// Implementations own their bounded request timeout (configurable, commonly
/// 10s) and surface it as [`ContentError::Timeout`]; callers never retry.
pub trait ContentStore: Send + Sync {
    fn fetch(&self, course_id: u64) -> Result<String, ContentError>;
    fn save(&self, course_id: u64, text: &str) -> Result<(), ContentError>;
}

/// Course text stored on disk as `<root>/<course_id>.md`.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn course_path(&self, course_id: u64) -> PathBuf {
        self.root.join(format!("{course_id}.md"))
    }
}

impl ContentStore for FsContentStore {
    fn fetch(&self, course_id: u64) -> Result<String, ContentError> {
        let path = self.course_path(course_id);
        if !path.exists() {
            return Err(ContentError::NotFound(course_id));
        }
        Ok(std::fs::read_to_string(&path)?)
    }

    fn save(&self, course_id: u64, text: &str) -> Result<(), ContentError> {
        let path = self.course_path(course_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, text)?;
        Ok(())
    }
}

/// One course's loaded text plus the editable buffer bound to the editor.
///
/// Loading never fails outward: a fetch error substitutes
/// [`LOAD_FAILED_DOCUMENT`] so the view always has something to render.
/// Saving commits the buffer to the loaded text only on success; a failed
/// save is logged, surfaced as an error, and leaves the buffer untouched so
/// nothing the author typed is lost.
pub struct CourseContent {
    store: Arc<dyn ContentStore>,
    course_id: u64,
    markdown: String,
    editable: String,
    saving: bool,
}

impl CourseContent {
    pub fn new(store: Arc<dyn ContentStore>, course_id: u64) -> Self {
        Self {
            store,
            course_id,
            markdown: String::new(),
            editable: String::new(),
            saving: false,
        }
    }

    pub fn course_id(&self) -> u64 {
        self.course_id
    }

    /// The loaded course text, as last fetched or saved.
    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    /// The editor buffer. Diverges from [`CourseContent::markdown`] while an
    /// edit is unsaved.
    pub fn editable(&self) -> &str {
        &self.editable
    }

    pub fn set_editable(&mut self, text: impl Into<String>) {
        self.editable = text.into();
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Fetch the course text, substituting the fallback document on failure.
    pub fn load(&mut self) {
        match self.store.fetch(self.course_id) {
            Ok(text) => {
                self.markdown = text.clone();
                self.editable = text;
            }
            Err(e) => {
                log::error!("failed to fetch content for course {}: {e}", self.course_id);
                self.markdown = LOAD_FAILED_DOCUMENT.to_string();
            }
        }
    }

    /// Persist the editor buffer. On success the buffer becomes the loaded
    /// text; on failure the in-memory edit is kept as-is.
    pub fn save(&mut self) -> Result<(), ContentError> {
        self.saving = true;
        let result = self.store.save(self.course_id, &self.editable);
        self.saving = false;

        match result {
            Ok(()) => {
                self.markdown = self.editable.clone();
                Ok(())
            }
            Err(e) => {
                log::error!("failed to save content for course {}: {e}", self.course_id);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fs_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path());

        store.save(7, "# Course Seven").unwrap();

        assert_eq!(store.fetch(7).unwrap(), "# Course Seven");
        assert!(dir.path().join("7.md").exists());
    }

    #[test]
    fn test_fs_store_missing_course_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path());

        let result = store.fetch(99);

        assert!(matches!(result, Err(ContentError::NotFound(99))));
    }

    #[test]
    fn test_load_success_fills_both_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsContentStore::new(dir.path()));
        store.save(1, "# Hello").unwrap();

        let mut content = CourseContent::new(store, 1);
        content.load();

        assert_eq!(content.markdown(), "# Hello");
        assert_eq!(content.editable(), "# Hello");
    }

    #[test]
    fn test_load_failure_substitutes_fallback_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsContentStore::new(dir.path()));

        let mut content = CourseContent::new(store, 404);
        content.load();

        assert_eq!(content.markdown(), LOAD_FAILED_DOCUMENT);
    }

    #[test]
    fn test_save_commits_buffer_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsContentStore::new(dir.path()));
        store.save(1, "# Old").unwrap();

        let mut content = CourseContent::new(store.clone(), 1);
        content.load();
        content.set_editable("# New");
        content.save().unwrap();

        assert_eq!(content.markdown(), "# New");
        assert_eq!(store.fetch(1).unwrap(), "# New");
    }

    #[test]
    fn test_save_failure_keeps_edit_buffer() {
        struct FailingStore;
        impl ContentStore for FailingStore {
            fn fetch(&self, course_id: u64) -> Result<String, ContentError> {
                Err(ContentError::NotFound(course_id))
            }
            fn save(&self, _course_id: u64, _text: &str) -> Result<(), ContentError> {
                Err(ContentError::Timeout(Duration::from_secs(10)))
            }
        }

        let mut content = CourseContent::new(Arc::new(FailingStore), 1);
        content.set_editable("# Unsaved work");

        let result = content.save();

        assert!(matches!(result, Err(ContentError::Timeout(_))));
        assert_eq!(content.editable(), "# Unsaved work");
        assert_ne!(content.markdown(), content.editable());
        assert!(!content.is_saving());
    }
}
