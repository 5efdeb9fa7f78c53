//! API Key 管理 - 业务能力层
//!
//! 持有有序的 Key 列表与活动下标，并负责本地持久化
//! （JSON 字符串数组，启动时读取一次，保存时写回）。
//!
//! 不变量：
//! - 列表可以为空；
//! - 活动下标始终落在 `[0, len)` 内，列表变更（保存）时归零；
//! - 下标只在配额耗尽时单调前进，项目重置时归零。

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// API Key 管理器
pub struct ApiKeyManager {
    keys: Vec<String>,
    active_index: usize,
    storage_path: PathBuf,
}

impl ApiKeyManager {
    /// 从本地文件加载 Key 列表
    ///
    /// 文件不存在时返回空列表（首次运行属正常情况）；
    /// 文件内容损坏时告警并返回空列表，不中断启动。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let storage_path = path.as_ref().to_path_buf();

        let keys = match std::fs::read_to_string(&storage_path) {
            Ok(content) => match serde_json::from_str::<Vec<String>>(&content) {
                Ok(keys) => keys,
                Err(e) => {
                    warn!("⚠️ API Key 文件解析失败，按空列表处理: {}", e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        if !keys.is_empty() {
            info!("🔑 已加载 {} 个 API Key", keys.len());
        }

        Self {
            keys,
            active_index: 0,
            storage_path,
        }
    }

    /// 创建内存中的管理器（测试用，不涉及文件）
    pub fn with_keys(keys: Vec<String>) -> Self {
        Self {
            keys,
            active_index: 0,
            storage_path: PathBuf::new(),
        }
    }

    /// 保存新的 Key 列表并持久化
    ///
    /// 列表变更后活动下标归零。
    pub fn save_keys(&mut self, keys: Vec<String>) -> Result<()> {
        let json = serde_json::to_string_pretty(&keys)?;
        std::fs::write(&self.storage_path, json).with_context(|| {
            format!("写入 API Key 文件失败: {}", self.storage_path.display())
        })?;

        self.keys = keys;
        self.active_index = 0;
        info!("🔑 已保存 {} 个 API Key", self.keys.len());
        Ok(())
    }

    /// 当前活动的 Key（列表为空时返回 None）
    pub fn active_key(&self) -> Option<&str> {
        self.keys.get(self.active_index).map(|k| k.as_str())
    }

    /// 前进到下一个 Key
    ///
    /// # 返回
    /// 成功前进返回 true；已经是最后一个 Key（或列表为空）返回 false。
    pub fn advance(&mut self) -> bool {
        if self.active_index + 1 < self.keys.len() {
            self.active_index += 1;
            true
        } else {
            false
        }
    }

    /// 活动下标归零（项目重置时调用）
    pub fn reset(&mut self) {
        self.active_index = 0;
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file() -> PathBuf {
        std::env::temp_dir().join(format!("api_keys_test_{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let manager = ApiKeyManager::load(temp_file());
        assert!(manager.is_empty());
        assert!(manager.active_key().is_none());
    }

    #[test]
    fn test_advance_never_exceeds_last_index() {
        let mut manager =
            ApiKeyManager::with_keys(vec!["k1".into(), "k2".into(), "k3".into()]);

        assert_eq!(manager.active_key(), Some("k1"));
        assert!(manager.advance());
        assert_eq!(manager.active_index(), 1);
        assert!(manager.advance());
        assert_eq!(manager.active_index(), 2);
        // 已在最后一个 Key，不能再前进
        assert!(!manager.advance());
        assert_eq!(manager.active_index(), 2);
        assert_eq!(manager.active_key(), Some("k3"));
    }

    #[test]
    fn test_advance_on_empty_list() {
        let mut manager = ApiKeyManager::with_keys(Vec::new());
        assert!(!manager.advance());
        assert!(manager.active_key().is_none());
    }

    #[test]
    fn test_save_resets_index_and_roundtrips() {
        let path = temp_file();
        let mut manager = ApiKeyManager::load(&path);
        manager.save_keys(vec!["a".into(), "b".into()]).unwrap();
        assert!(manager.advance());
        assert_eq!(manager.active_index(), 1);

        // 保存新列表后下标归零
        manager.save_keys(vec!["c".into(), "d".into(), "e".into()]).unwrap();
        assert_eq!(manager.active_index(), 0);
        assert_eq!(manager.active_key(), Some("c"));

        // 重新加载恢复保存的列表
        let reloaded = ApiKeyManager::load(&path);
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.active_key(), Some("c"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_reset() {
        let mut manager = ApiKeyManager::with_keys(vec!["k1".into(), "k2".into()]);
        manager.advance();
        manager.reset();
        assert_eq!(manager.active_index(), 0);
    }
}
