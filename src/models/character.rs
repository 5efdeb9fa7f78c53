use serde::{Deserialize, Serialize};

/// 参考角色
///
/// `prompt` 为角色的外观/性格描述，供后续所有生成任务引用；
/// `image_data` 为参考图的 data URL，分镜配图时作为风格参照。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterReference {
    pub id: String,
    pub name: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_data: Option<String>,
}

impl CharacterReference {
    /// 创建新角色（自动分配 id）
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            prompt: prompt.into(),
            image_data: None,
        }
    }
}

/// 角色设定变体（由模型按 schema 返回）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterVariation {
    pub title: String,
    pub description: String,
}
