use std::num::NonZeroUsize;
use std::time::SystemTime;

use bytes::Bytes;
use log::warn;
use lru::LruCache;

/// 超过该大小的静态资源不进入缓存
pub const MAX_CACHED_ASSET: u64 = 1048576; // 1MB

#[derive(Clone)]
struct CacheEntry {
    content: Bytes,
    modified_time: SystemTime,
}

/// 静态资源缓存。以文件路径为键，文件修改时间变化后旧条目自动失效。
pub struct AssetCache {
    cache: LruCache<String, CacheEntry>,
}

impl AssetCache {
    // 根据容量构造
    pub fn from_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or_else(|| {
            warn!("静态资源缓存容量为0，改为1");
            NonZeroUsize::MIN
        });
        Self {
            cache: LruCache::new(capacity),
        }
    }

    // 放入
    pub fn push(&mut self, path: &str, bytes: Bytes, modified_time: SystemTime) {
        let entry = CacheEntry {
            content: bytes,
            modified_time,
        };
        self.cache.put(path.to_string(), entry);
    }

    // 检查文件大小是否适合缓存
    pub fn should_cache(file_size: u64) -> bool {
        file_size <= MAX_CACHED_ASSET
    }

    // 查询有效缓存，返回的 Bytes 克隆只增加引用计数
    pub fn find(&mut self, path: &str, current_modified_time: SystemTime) -> Option<Bytes> {
        match self.cache.get(path) {
            Some(entry) if entry.modified_time == current_modified_time => {
                Some(entry.content.clone())
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}
