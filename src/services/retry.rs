//! 重试策略 - 业务能力层
//!
//! 对单次远程调用做有界的指数退避重试，只处理瞬态的服务器错误。
//!
//! 分类规则（基于错误文本）：
//! - 配额耗尽：立即原样抛出，不重试——配额由上一层的 Key 轮换处理，
//!   盲目重试只会继续消耗配额。
//! - 服务器过载/不可用（503 类）：指数退避后重试，
//!   延迟 = initial_delay * 2^尝试序号 + 0~500ms 随机抖动。
//! - 其他错误：不可重试，立即原样抛出。
//!
//! 尝试总数不超过 `max_attempts`；最后一次尝试失败后不再等待，
//! 最后观察到的错误原样返回（不包装），由调用方负责转换文案。

use crate::services::classifier;
use anyhow::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

/// 抖动上限（毫秒）
const MAX_JITTER_MS: u64 = 500;

/// 带重试地执行一次远程调用
///
/// # 参数
/// - `operation`: 每次尝试都会重新调用的操作闭包
/// - `max_attempts`: 最大尝试次数（含首次）
/// - `initial_delay`: 首次重试前的基础延迟
/// - `context`: 操作名称，用于日志
pub async fn with_retry<T, F, Fut>(
    mut operation: F,
    max_attempts: usize,
    initial_delay: Duration,
    context: &str,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let message = err.to_string();

                // 配额错误交由上层 Key 轮换处理，此处不重试
                if classifier::is_quota_error(&message) {
                    return Err(err);
                }

                // 非瞬态错误不可重试
                if !classifier::is_server_error(&message) {
                    return Err(err);
                }

                if attempt + 1 >= max_attempts {
                    error!("服务器重试已全部失败 (操作: {})", context);
                    return Err(err);
                }

                let delay = initial_delay * 2u32.saturating_pow(attempt as u32);
                let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=MAX_JITTER_MS));
                warn!(
                    "第 {}/{} 次尝试失败 (操作: {})，服务器繁忙，{}ms 后重试...",
                    attempt + 1,
                    max_attempts,
                    context,
                    delay.as_millis()
                );

                sleep(delay + jitter).await;
                attempt += 1;
            }
        }
    }
}
