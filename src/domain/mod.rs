pub mod content;
pub mod progress;
pub mod record;
pub mod storage;

pub use content::{
    ContentItem, ContentKind, LessonContent, LessonRef, Link, ModuleContent, TrailInfo,
    NO_DESCRIPTION, UNTITLED,
};
pub use progress::{CrawlStats, ProgressState};
pub use record::{
    url_digest, BatchEntry, BatchOutcome, BatchReport, CrawlRecord, TrailOutcome, TrailRecord,
};
pub use storage::{NameValue, OriginStorage, StorageState, StoredCookie};
