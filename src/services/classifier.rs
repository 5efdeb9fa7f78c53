//! 错误分类 - 业务能力层
//!
//! 两个层面的职责：
//! 1. 窄谓词（`is_quota_error` / `is_server_error`）：基于错误文本的子串匹配，
//!    供重试策略与 Key 轮换做控制流判断。重试层与轮换层必须使用同一个
//!    配额谓词，否则"不重试"与"该轮换"的判断会出现分歧。
//! 2. `classify`：把原始错误归入固定的错误分类（纯函数，永不失败），
//!    `GenerationError` 的 Display 即面向用户的提示文案。

use crate::error::GenerationError;

/// 配额耗尽谓词
///
/// 统一匹配 "quota" / "resource_exhausted" / "429"（忽略大小写）。
/// 命中时：重试策略立即放弃（交由 Key 轮换处理），轮换控制器切换 Key。
pub fn is_quota_error(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("quota") || lower.contains("resource_exhausted") || lower.contains("429")
}

/// 服务器瞬态错误谓词（可安全重试）
pub fn is_server_error(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("503") || lower.contains("overloaded") || lower.contains("unavailable")
}

/// 网络/代理错误谓词
fn is_network_error(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("failed to fetch")
        || lower.contains("tls handshake")
        || lower.contains("error sending request")
        || lower.contains("connection")
}

/// API Key 无效谓词
fn is_invalid_key_error(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("api key not valid")
        || lower.contains("api_key_invalid")
        || lower.contains("invalid token")
        || lower.contains("401")
}

/// 错误分类
///
/// 按固定顺序归类（首个命中即返回）：配额 → 无效 Key → 服务器过载 →
/// 网络 → 通用；错误文本为空时归为未知错误。
///
/// 纯函数，对任何输入都不会 panic。
pub fn classify(error: &anyhow::Error, context: &str) -> GenerationError {
    let message = error.to_string();

    if message.trim().is_empty() {
        return GenerationError::Unknown {
            context: context.to_string(),
        };
    }
    if is_quota_error(&message) {
        return GenerationError::QuotaExceeded;
    }
    if is_invalid_key_error(&message) {
        return GenerationError::InvalidApiKey {
            context: context.to_string(),
        };
    }
    if is_server_error(&message) {
        return GenerationError::ServerOverloaded {
            context: context.to_string(),
        };
    }
    if is_network_error(&message) {
        return GenerationError::NetworkError;
    }

    GenerationError::Generic {
        context: context.to_string(),
        message,
    }
}

/// 把任意错误转换为类型化的 GenerationError
///
/// 解析阶段产生的错误已是 GenerationError（如 MalformedResponse），
/// 直接透传；其余错误走文本分类。
pub fn translate(error: anyhow::Error, context: &str) -> GenerationError {
    match error.downcast::<GenerationError>() {
        Ok(generation_error) => generation_error,
        Err(raw) => classify(&raw, context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_quota_predicate_case_insensitive() {
        assert!(is_quota_error("RESOURCE_EXHAUSTED"));
        assert!(is_quota_error("resource_exhausted"));
        assert!(is_quota_error("You exceeded your current quota"));
        assert!(is_quota_error("Gemini API 返回错误 (HTTP 429): ..."));
        assert!(!is_quota_error("HTTP 503 Service Unavailable"));
        assert!(!is_quota_error("network unreachable"));
    }

    #[test]
    fn test_server_predicate() {
        assert!(is_server_error("HTTP 503"));
        assert!(is_server_error("The model is overloaded"));
        assert!(is_server_error("UNAVAILABLE"));
        assert!(!is_server_error("HTTP 400 bad request"));
    }

    #[test]
    fn test_classify_bucket_order() {
        // 配额优先于其他分类
        let err = anyhow!("HTTP 429: RESOURCE_EXHAUSTED, service unavailable");
        assert!(matches!(classify(&err, "t"), GenerationError::QuotaExceeded));

        let err = anyhow!("API key not valid. Please pass a valid API key.");
        assert!(matches!(
            classify(&err, "t"),
            GenerationError::InvalidApiKey { .. }
        ));

        let err = anyhow!("HTTP 503: the model is overloaded");
        assert!(matches!(
            classify(&err, "t"),
            GenerationError::ServerOverloaded { .. }
        ));

        let err = anyhow!("error sending request for url");
        assert!(matches!(classify(&err, "t"), GenerationError::NetworkError));

        let err = anyhow!("something entirely different");
        match classify(&err, "generate_script") {
            GenerationError::Generic { context, message } => {
                assert_eq!(context, "generate_script");
                assert!(message.contains("entirely different"));
            }
            other => panic!("意外的分类结果: {:?}", other),
        }
    }

    #[test]
    fn test_classify_empty_message_is_unknown() {
        let err = anyhow!("   ");
        assert!(matches!(classify(&err, "t"), GenerationError::Unknown { .. }));
    }

    #[test]
    fn test_translate_passes_through_typed_errors() {
        let typed: anyhow::Error = GenerationError::NoImageData.into();
        assert!(matches!(
            translate(typed, "t"),
            GenerationError::NoImageData
        ));

        let raw = anyhow!("quota exceeded");
        assert!(matches!(translate(raw, "t"), GenerationError::QuotaExceeded));
    }
}
