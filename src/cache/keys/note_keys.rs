/// 笔记元数据缓存键前缀
const NOTE_PREFIX: &str = "note:";

pub fn note_metadata_key(slug: &str) -> String {
    format!("{}{}", NOTE_PREFIX, slug)
}
