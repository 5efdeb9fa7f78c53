/// Gemini API 客户端
///
/// 封装所有与 generateContent 端点相关的调用逻辑。
/// 注意：不设置请求超时——挂起的请求不会被主动中断，
/// 调用上限由上层重试策略的尝试次数约束。
use crate::config::Config;
use anyhow::{bail, Result};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;
use tracing::debug;

/// data URL 解析正则（懒初始化，全局复用）
fn data_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^data:(image/[^;]+);base64,(.+)$").expect("正则表达式无效"))
}

/// Gemini 客户端
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
}

impl GeminiClient {
    /// 创建新的 Gemini 客户端
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.clone(),
            api_version: config.api_version.clone(),
        }
    }

    /// 构建 Google AI Studio 端点 URL（Key 作为查询参数）
    fn endpoint(&self, model: &str, api_key: &str) -> String {
        format!(
            "{}/{}/models/{}:generateContent?key={}",
            self.base_url, self.api_version, model, api_key
        )
    }

    /// 发送 generateContent 请求
    ///
    /// # 参数
    /// - `api_key`: 本次调用使用的 API Key
    /// - `model`: 模型名称
    /// - `body`: 完整请求体（contents / systemInstruction / generationConfig）
    ///
    /// # 返回
    /// 返回响应 JSON。HTTP 错误状态会连同状态码与响应正文一起转为错误文本，
    /// 保证 "429" / "RESOURCE_EXHAUSTED" / "503" 等子串对上层分类器可见。
    pub async fn generate_content(&self, api_key: &str, model: &str, body: Value) -> Result<Value> {
        let url = self.endpoint(model, api_key);

        debug!("调用 Gemini API，模型: {}", model);

        let response = self.http.post(&url).json(&body).send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            bail!("Gemini API 返回错误 (HTTP {}): {}", status.as_u16(), text);
        }

        let json_response: Value = serde_json::from_str(&text)?;

        // 部分错误以 200 返回，错误信息在 error 字段中
        if let Some(error) = json_response.get("error") {
            bail!("Gemini API 返回错误: {}", error);
        }

        debug!("Gemini API 调用成功");

        Ok(json_response)
    }

    /// 提取首个候选的全部文本内容
    pub fn extract_text(response: &Value) -> Result<String> {
        let parts = Self::first_candidate_parts(response)?;

        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();

        if text.trim().is_empty() {
            bail!("模型返回文本为空");
        }

        Ok(text.trim().to_string())
    }

    /// 提取首个候选中的内联图片数据
    ///
    /// # 返回
    /// 返回 (mimeType, base64 数据)；响应中没有图片部件时返回 None。
    pub fn extract_inline_image(response: &Value) -> Option<(String, String)> {
        let parts = Self::first_candidate_parts(response).ok()?;

        for part in parts {
            if let Some(inline) = part.get("inlineData") {
                let mime = inline.get("mimeType").and_then(|m| m.as_str())?;
                let data = inline.get("data").and_then(|d| d.as_str())?;
                return Some((mime.to_string(), data.to_string()));
            }
        }
        None
    }

    fn first_candidate_parts(response: &Value) -> Result<&Vec<Value>> {
        response
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .ok_or_else(|| anyhow::anyhow!("响应中缺少候选内容"))
    }
}

/// 解析图片 data URL
///
/// # 返回
/// 返回 (mimeType, base64 数据)
pub fn parse_data_url(data_url: &str) -> Result<(String, String)> {
    let captures = data_url_regex()
        .captures(data_url)
        .ok_or_else(|| anyhow::anyhow!("无效的 base64 图片格式"))?;
    Ok((captures[1].to_string(), captures[2].to_string()))
}

/// 构建内联图片部件
pub fn inline_image_part(mime_type: &str, data: &str) -> Value {
    json!({
        "inlineData": {
            "mimeType": mime_type,
            "data": data,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_url() {
        let data_url = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==";
        let (mime, data) = parse_data_url(data_url).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(data, "iVBORw0KGgoAAAANSUhEUg==");
    }

    #[test]
    fn test_parse_data_url_invalid() {
        assert!(parse_data_url("not a data url").is_err());
        assert!(parse_data_url("data:text/plain;base64,AAAA").is_err());
        assert!(parse_data_url("data:image/png;base64,").is_err());
    }

    #[test]
    fn test_endpoint_format() {
        let client = GeminiClient::new(&crate::config::Config::default());
        let url = client.endpoint("gemini-2.5-pro", "test-key");
        assert!(url.contains("generativelanguage.googleapis.com"));
        assert!(url.contains("models/gemini-2.5-pro:generateContent"));
        assert!(url.contains("key=test-key"));
    }

    #[test]
    fn test_extract_text() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "第一段" },
                        { "text": "第二段" }
                    ]
                }
            }]
        });
        assert_eq!(GeminiClient::extract_text(&response).unwrap(), "第一段第二段");
    }

    #[test]
    fn test_extract_text_empty_is_error() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "  " }] } }]
        });
        assert!(GeminiClient::extract_text(&response).is_err());
    }

    #[test]
    fn test_extract_inline_image() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "说明文字" },
                        { "inlineData": { "mimeType": "image/png", "data": "QUJD" } }
                    ]
                }
            }]
        });
        let (mime, data) = GeminiClient::extract_inline_image(&response).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(data, "QUJD");
    }

    #[test]
    fn test_extract_inline_image_absent() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "只有文本" }] } }]
        });
        assert!(GeminiClient::extract_inline_image(&response).is_none());
    }
}
