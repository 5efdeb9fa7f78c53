use thiserror::Error;

/// 生成任务错误类型
///
/// 覆盖整个生成链路的错误分类：配额、无效 Key、服务器过载、网络、
/// 响应结构不符、无图片数据、未配置 Key、全部 Key 耗尽、通用错误。
///
/// `Display` 输出即面向用户的提示信息；控制流判断（是否轮换 Key）
/// 只依赖 `is_quota`，与人类可读文案解耦。
#[derive(Debug, Error)]
pub enum GenerationError {
    /// API 配额已用尽（触发 Key 轮换，不在重试层处理）
    #[error("API 配额已用尽，请求过于频繁。请稍候重试，或在设置中追加新的 API Key")]
    QuotaExceeded,

    /// API Key 无效
    #[error("API Key 无效，请检查配置 (操作: {context})")]
    InvalidApiKey { context: String },

    /// 模型服务器繁忙或过载
    #[error("模型服务器繁忙或过载，请稍后重试 (操作: {context})")]
    ServerOverloaded { context: String },

    /// 网络或代理连接失败
    #[error("网络或代理连接失败，请检查网络状态后重试")]
    NetworkError,

    /// 响应结构不符合预期
    #[error("模型响应结构不符合预期 (操作: {context}): {detail}")]
    MalformedResponse { context: String, detail: String },

    /// 模型响应中未包含图片数据
    #[error("模型响应中未包含图片数据")]
    NoImageData,

    /// 尚未配置任何 API Key
    #[error("尚未配置任何 API Key，请先在设置中添加至少一个 Key")]
    NoApiKeys,

    /// 所有已配置的 API Key 配额均已用尽
    #[error("所有已配置的 API Key 配额均已用尽，请添加新 Key 或等待配额重置")]
    AllKeysExhausted,

    /// 其他错误（携带原始错误文本）
    #[error("生成失败 (操作: {context}): {message}")]
    Generic { context: String, message: String },

    /// 未知错误（原始错误无可用信息）
    #[error("发生未知错误 (操作: {context})")]
    Unknown { context: String },
}

impl GenerationError {
    /// 是否为配额类错误（QuotaExceeded 触发轮换，AllKeysExhausted 为终态）
    pub fn is_quota(&self) -> bool {
        matches!(self, GenerationError::QuotaExceeded)
    }

    /// 创建响应结构错误
    pub fn malformed(context: impl Into<String>, detail: impl Into<String>) -> Self {
        GenerationError::MalformedResponse {
            context: context.into(),
            detail: detail.into(),
        }
    }
}

/// 生成任务结果类型
pub type GenerationResult<T> = Result<T, GenerationError>;
