//! Key 轮换执行器 - 编排层
//!
//! 把"一次生成任务"在 Key 列表上重新提交，直到成功或 Key 耗尽：
//! - 配额错误且还有下一个 Key：前进下标后用新 Key 重新提交整个任务；
//! - 配额错误且已是最后一个 Key：返回 `AllKeysExhausted`；
//! - 其他任何错误：原样返回，不轮换（轮换解决不了非配额问题）。
//!
//! 任务内部的瞬态重试由重试策略负责，本层只看任务的终态结果。

use crate::error::GenerationError;
use crate::services::ApiKeyManager;
use std::future::Future;
use tracing::{info, warn};

/// 在 Key 列表上带轮换地执行一次生成任务
///
/// # 参数
/// - `key_manager`: Key 管理器，轮换会推进其活动下标
/// - `task`: 以指定 Key 执行一次完整任务的闭包，可能被多次调用
///
/// Key 列表为空时直接返回 `NoApiKeys`，任务一次也不会执行。
pub async fn run_with_rotation<T, F, Fut>(
    key_manager: &mut ApiKeyManager,
    mut task: F,
) -> Result<T, GenerationError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    loop {
        let api_key = match key_manager.active_key() {
            Some(key) => key.to_string(),
            None => return Err(GenerationError::NoApiKeys),
        };

        match task(api_key).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_quota() => {
                if key_manager.advance() {
                    warn!(
                        "⚠️ API Key 配额耗尽，切换到第 {}/{} 个 Key 后重新提交",
                        key_manager.active_index() + 1,
                        key_manager.len()
                    );
                    continue;
                }
                info!("❌ 所有 API Key 配额均已耗尽");
                return Err(GenerationError::AllKeysExhausted);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_rotates_on_quota_then_succeeds() {
        let mut manager =
            ApiKeyManager::with_keys(vec!["k1".into(), "k2".into(), "k3".into()]);
        let used_keys = Arc::new(Mutex::new(Vec::new()));
        let recorder = used_keys.clone();

        let result = run_with_rotation(&mut manager, |key| {
            let recorder = recorder.clone();
            async move {
                recorder.lock().unwrap().push(key.clone());
                if key == "k3" {
                    Ok("完成")
                } else {
                    Err(GenerationError::QuotaExceeded)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "完成");
        // 恰好轮换两次，停在第三个 Key 上
        assert_eq!(*used_keys.lock().unwrap(), vec!["k1", "k2", "k3"]);
        assert_eq!(manager.active_index(), 2);
    }

    #[tokio::test]
    async fn test_all_keys_exhausted() {
        let mut manager = ApiKeyManager::with_keys(vec!["k1".into(), "k2".into()]);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = run_with_rotation(&mut manager, |_key| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(GenerationError::QuotaExceeded)
            }
        })
        .await;

        assert!(matches!(result, Err(GenerationError::AllKeysExhausted)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // 下标停在最后一个 Key，不回绕
        assert_eq!(manager.active_index(), 1);
    }

    #[tokio::test]
    async fn test_empty_key_list_never_invokes_task() {
        let mut manager = ApiKeyManager::with_keys(Vec::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = run_with_rotation(&mut manager, |_key| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert!(matches!(result, Err(GenerationError::NoApiKeys)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_quota_error_does_not_rotate() {
        let mut manager = ApiKeyManager::with_keys(vec!["k1".into(), "k2".into()]);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = run_with_rotation(&mut manager, |_key| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(GenerationError::ServerOverloaded {
                    context: "test".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(GenerationError::ServerOverloaded { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.active_index(), 0);
    }
}
