use serde::{Deserialize, Serialize};

/// 单个分镜的结构化提示词
///
/// 与模型约定的 responseSchema 一一对应：11 个自由文本字段、
/// 两个字符串数组（keywords / negative_prompts）、一个整数（duration_seconds）。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenePrompt {
    pub scene_description: String,
    pub character_description: String,
    pub background_description: String,
    pub camera_shot: String,
    pub lighting: String,
    pub color_palette: String,
    pub style: String,
    pub composition_notes: String,
    pub sound_effects: String,
    pub dialogue: String,
    pub keywords: Vec<String>,
    pub negative_prompts: Vec<String>,
    pub aspect_ratio: String,
    pub duration_seconds: u32,
}

/// 单个分镜
///
/// `scene_id` 从 1 开始连续编号，展示时始终按 `scene_id` 排序。
/// `image_data` 为生成图片的 data URL，生成前为 None。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub scene_id: u32,
    /// "MM:SS" 格式的时间戳
    pub time: String,
    pub prompt: ScenePrompt,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_data: Option<String>,
    /// 图片生成中标志（瞬态，不序列化）
    #[serde(skip)]
    pub is_generating_image: bool,
}

/// 分镜生成进度
///
/// `current` 为已累计的分镜数，`total` 为预期总数；
/// 一次生成过程中单调不减，项目重置时归零。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationProgress {
    pub current: usize,
    pub total: usize,
}
