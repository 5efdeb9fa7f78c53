use serde::{Deserialize, Serialize};

/// 视频格式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoFormat {
    /// 健康知识讲解
    HealthExplainer,
    /// 真相与谣言问答
    MythFact,
    /// 分步教程
    StepByStep,
}

impl VideoFormat {
    /// 获取格式标识符
    pub fn key(self) -> &'static str {
        match self {
            VideoFormat::HealthExplainer => "health_explainer",
            VideoFormat::MythFact => "myth_fact",
            VideoFormat::StepByStep => "step_by_step",
        }
    }

    /// 从标识符解析格式
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "health_explainer" => Some(VideoFormat::HealthExplainer),
            "myth_fact" => Some(VideoFormat::MythFact),
            "step_by_step" => Some(VideoFormat::StepByStep),
            _ => None,
        }
    }
}

/// 视频生成配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// 目标总时长（秒）
    pub duration: u32,
    /// 动画风格标识（如 "friendly_2d"）
    pub style: String,
    /// 是否包含角色台词
    pub include_dialogue: bool,
    /// 台词语言代码（如 "en"、"vi"）
    pub dialogue_language: String,
    pub format: VideoFormat,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            duration: 120,
            style: "friendly_2d".to_string(),
            include_dialogue: true,
            dialogue_language: "en".to_string(),
            format: VideoFormat::HealthExplainer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_key_roundtrip() {
        for format in [
            VideoFormat::HealthExplainer,
            VideoFormat::MythFact,
            VideoFormat::StepByStep,
        ] {
            assert_eq!(VideoFormat::from_key(format.key()), Some(format));
        }
        assert_eq!(VideoFormat::from_key("unknown"), None);
    }
}
