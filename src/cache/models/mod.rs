/// 缓存数据模型
/// 定义缓存数据的结构体
pub mod note;

pub use note::CachedNoteMetadata;
