pub mod content;
pub mod outline;
pub mod progress;
pub mod render;
pub mod sync;

// Re-export key types for easier usage
pub use content::{ContentError, ContentStore, CourseContent, FsContentStore};
pub use outline::{OutlineItem, flatten_outline, parse_outline, slug::slugify};
pub use progress::{
    ReadingTracker,
    mapping::{ChapterInfo, build_chapter_mapping},
    store::{LearningProgress, LearningStatus, MemoryProgressStore, ProgressStore, ProgressUpdate},
};
pub use render::MarkdownRenderer;
pub use sync::{ScrollSync, SyncOptions, view::ViewAdapter};
