//! 生成服务 - 业务能力层（Provider Gateway）
//!
//! 每个生成任务一个类型化函数：
//! 图生角色描述 / 角色变体 / 故事灵感 / 脚本 / 分镜批次 / 分镜配图。
//!
//! 每个函数只负责：构建请求 → 经重试策略调用 → 解析校验响应 →
//! 把终态错误转换为类型化的 GenerationError。
//! 不持有任何项目状态，不关心 Key 轮换与批次推进。

use crate::clients::gemini_client::{inline_image_part, parse_data_url, GeminiClient};
use crate::config::Config;
use crate::error::{GenerationError, GenerationResult};
use crate::models::{CharacterVariation, Scene, ScenePrompt, VideoConfig};
use crate::services::{classifier, retry::with_retry};
use anyhow::Result;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// 生成服务
pub struct GenerationService {
    config: Config,
    client: GeminiClient,
}

impl GenerationService {
    /// 创建新的生成服务
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            client: GeminiClient::new(config),
        }
    }

    fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.config.initial_retry_delay_ms)
    }

    /// 从参考图生成角色描述（自由文本）
    pub async fn character_prompt_from_image(
        &self,
        image_data_url: &str,
        api_key: &str,
    ) -> GenerationResult<String> {
        let context = "character_prompt_from_image";

        let (mime_type, data) = parse_data_url(image_data_url)
            .map_err(|e| GenerationError::malformed(context, e.to_string()))?;

        let body = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_CHARACTER_PROMPT }] },
            "contents": [{
                "role": "user",
                "parts": [
                    inline_image_part(&mime_type, &data),
                    { "text": "Please describe the character in this image in detail for an animation project." }
                ]
            }]
        });

        let result = with_retry(
            || {
                let body = body.clone();
                async move {
                    let response = self
                        .client
                        .generate_content(api_key, &self.config.text_model_name, body)
                        .await?;
                    GeminiClient::extract_text(&response)
                }
            },
            self.config.max_retries,
            self.initial_delay(),
            context,
        )
        .await;

        result.map_err(|e| classifier::translate(e, context))
    }

    /// 生成角色设定变体（schema 约束输出，结构不符为硬失败）
    pub async fn character_variations(
        &self,
        character_name: &str,
        animation_style: &str,
        story_style: &str,
        api_key: &str,
    ) -> GenerationResult<Vec<CharacterVariation>> {
        let context = "character_variations";

        let system = format!(
            "You are an expert art director and creative writer specializing in character design. \
             Generate 3 distinct visual and personality variations for a character named \"{}\". \
             The animation style is \"{}\" and the story tone is \"{}\". \
             Each variation needs a short evocative title and a detailed visual description \
             usable as an image-generation prompt.",
            character_name, animation_style, story_style
        );

        let body = json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": [{
                "role": "user",
                "parts": [{ "text": "Please generate 3 character variations based on the system instruction." }]
            }],
            "generationConfig": {
                "temperature": 0.9,
                "responseMimeType": "application/json",
                "responseSchema": variations_schema(),
            }
        });

        let result = with_retry(
            || {
                let body = body.clone();
                async move {
                    let response = self
                        .client
                        .generate_content(api_key, &self.config.text_model_name, body)
                        .await?;
                    let text = GeminiClient::extract_text(&response)?;
                    parse_variations_response(&text)
                }
            },
            self.config.max_retries,
            self.initial_delay(),
            context,
        )
        .await;

        result.map_err(|e| classifier::translate(e, context))
    }

    /// 生成故事灵感（自由文本）
    pub async fn story_idea(
        &self,
        animation_style: &str,
        story_style: &str,
        character_descriptions: &str,
        api_key: &str,
    ) -> GenerationResult<String> {
        let context = "story_idea";

        let system = format!(
            "You are a creative scriptwriter specializing in fun, educational explainer videos. \
             Propose one short animation story concept in which the character(s) below explain a \
             topic to the audience in first person. Animation style: \"{}\". Story tone: \"{}\".\n\n\
             Available characters:\n{}\n\n\
             The output must be ONLY the story concept text, a few sentences long.",
            animation_style, story_style, character_descriptions
        );

        let body = json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": [{
                "role": "user",
                "parts": [{ "text": "Please generate an animation story concept for the character(s) provided in the system instruction." }]
            }],
            "generationConfig": { "temperature": 0.9 }
        });

        let result = with_retry(
            || {
                let body = body.clone();
                async move {
                    let response = self
                        .client
                        .generate_content(api_key, &self.config.text_model_name, body)
                        .await?;
                    GeminiClient::extract_text(&response)
                }
            },
            self.config.max_retries,
            self.initial_delay(),
            context,
        )
        .await;

        result.map_err(|e| classifier::translate(e, context))
    }

    /// 根据故事灵感生成完整脚本（自由文本）
    pub async fn script(
        &self,
        story_idea: &str,
        video_config: &VideoConfig,
        character_descriptions: &str,
        api_key: &str,
    ) -> GenerationResult<String> {
        let context = "script";

        let total_scenes = expected_scene_count(
            video_config.duration,
            self.config.scene_duration_seconds,
        );
        let dialogue_instruction = if video_config.include_dialogue {
            format!(
                "The script MUST be written from the first-person perspective of the character, \
                 speaking directly to the audience. All narration/dialogue MUST be written ONLY \
                 in the language with code \"{}\".",
                video_config.dialogue_language
            )
        } else {
            "The script should be purely descriptive and contain NO narration or dialogue whatsoever.".to_string()
        };

        let system = format!(
            "You are a professional scriptwriter for creative and educational videos. \
             Expand the given topic idea into a full script where a character persona speaks to the audience. \
             The final video is about {} seconds long, which corresponds to exactly {} scenes.\n\n\
             The script MUST follow this structure:\n\
             - ACT 1, the hook: the character introduces itself and its unique take on the topic.\n\
             - ACT 2, the explanation: the character explains the core concept in simple terms.\n\
             - ACT 3, the takeaway: the character leaves the audience with a concluding thought or call to action.\n\n\
             CRITICAL RULE, NO REPETITION: each scene must introduce new information or visually advance the narrative.\n\n\
             {}\n\n\
             Video format: {}.\n\n\
             Available characters:\n{}\n\n\
             The output must be ONLY the script text, formatted as a list of scenes.",
            video_config.duration,
            total_scenes,
            dialogue_instruction,
            video_config.format.key(),
            character_descriptions
        );

        let user = format!(
            "**Animation Story Idea:**\n{}\n\n**Animation Style:** {}",
            story_idea, video_config.style
        );

        let body = json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": [{ "role": "user", "parts": [{ "text": user }] }],
            "generationConfig": { "temperature": 0.9 }
        });

        let result = with_retry(
            || {
                let body = body.clone();
                async move {
                    let response = self
                        .client
                        .generate_content(api_key, &self.config.text_model_name, body)
                        .await?;
                    GeminiClient::extract_text(&response)
                }
            },
            self.config.max_retries,
            self.initial_delay(),
            context,
        )
        .await;

        result.map_err(|e| classifier::translate(e, context))
    }

    /// 请求一批分镜
    ///
    /// 本批分镜从 `scene_id = existing_count + 1` 开始，共 `batch_size` 个。
    /// 响应缺少顶层 scenes 数组时软失败为空列表（进度不推进，可从同一
    /// 检查点重试）；数组内分镜结构不符则为硬失败。
    pub async fn scene_batch(
        &self,
        script: &str,
        video_config: &VideoConfig,
        character_descriptions: &str,
        existing_count: usize,
        batch_size: usize,
        api_key: &str,
    ) -> GenerationResult<Vec<Scene>> {
        let context = "scene_batch";

        let start_scene_id = existing_count + 1;
        let system = scene_batch_system_instruction(
            video_config,
            character_descriptions,
            start_scene_id,
            existing_count,
            batch_size,
            self.config.scene_duration_seconds,
        );

        let user = format!(
            "**Full Animation Script to be Visualized:**\n{}\n\n\
             **Animation Configuration:**\n\
             - Total Duration: {} seconds\n\
             - Format: {}\n\
             - Scenes to generate in this batch: {}",
            script,
            video_config.duration,
            video_config.format.key(),
            batch_size
        );

        let body = json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": [{ "role": "user", "parts": [{ "text": user }] }],
            "generationConfig": {
                "temperature": 0.9,
                "responseMimeType": "application/json",
                "responseSchema": scenes_schema(),
            }
        });

        // 分镜批次的基础重试延迟略长（响应体大，服务器恢复慢）
        let delay = self.initial_delay() + Duration::from_millis(500);

        let result = with_retry(
            || {
                let body = body.clone();
                async move {
                    let response = self
                        .client
                        .generate_content(api_key, &self.config.text_model_name, body)
                        .await?;
                    let text = GeminiClient::extract_text(&response)?;
                    parse_scenes_response(&text)
                }
            },
            self.config.max_retries,
            delay,
            context,
        )
        .await;

        result.map_err(|e| classifier::translate(e, context))
    }

    /// 为单个分镜生成配图
    ///
    /// # 参数
    /// - `prompt`: 分镜的结构化提示词
    /// - `reference_data_url`: 参考角色图（data URL），用于角色与风格一致性
    ///
    /// # 返回
    /// 返回生成图片的 data URL
    pub async fn scene_image(
        &self,
        prompt: &ScenePrompt,
        reference_data_url: &str,
        api_key: &str,
    ) -> GenerationResult<String> {
        let context = "scene_image";

        let (mime_type, data) = parse_data_url(reference_data_url)
            .map_err(|e| GenerationError::malformed(context, e.to_string()))?;

        let prompt_json = serde_json::to_string_pretty(prompt)
            .map_err(|e| GenerationError::malformed(context, e.to_string()))?;
        let instruction = format!(
            "Using the provided reference image for character and style consistency, create a \
             single animation frame based on the following detailed JSON prompt: {}",
            prompt_json
        );

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    inline_image_part(&mime_type, &data),
                    { "text": instruction }
                ]
            }],
            "generationConfig": { "responseModalities": ["IMAGE"] }
        });

        let delay = self.initial_delay() + Duration::from_millis(500);

        let result = with_retry(
            || {
                let body = body.clone();
                async move {
                    let response = self
                        .client
                        .generate_content(api_key, &self.config.image_model_name, body)
                        .await?;

                    match GeminiClient::extract_inline_image(&response) {
                        Some((_, image_data)) => {
                            Ok(format!("data:image/png;base64,{}", image_data))
                        }
                        None => Err(GenerationError::NoImageData.into()),
                    }
                }
            },
            self.config.max_retries,
            delay,
            context,
        )
        .await;

        result.map_err(|e| classifier::translate(e, context))
    }
}

/// 预期分镜总数 = round(总时长 / 单镜时长)
pub fn expected_scene_count(total_duration_seconds: u32, scene_duration_seconds: u32) -> usize {
    (f64::from(total_duration_seconds) / f64::from(scene_duration_seconds)).round() as usize
}

const SYSTEM_CHARACTER_PROMPT: &str =
    "You are an expert art director specializing in character design for animations. \
     Describe the character in the provided image precisely and vividly: appearance, colors, \
     shapes, clothing, expression and personality cues. The description will be used verbatim \
     as an image-generation prompt, so keep it visual and concrete. Output ONLY the description.";

fn scene_batch_system_instruction(
    video_config: &VideoConfig,
    character_descriptions: &str,
    start_scene_id: usize,
    existing_count: usize,
    batch_size: usize,
    scene_duration: u32,
) -> String {
    let dialogue_field = if video_config.include_dialogue {
        format!(
            "You MUST extract the character's speaking line for this scene from the script, \
             in the language with code \"{}\". If the character is not speaking in this scene, \
             use an empty string.",
            video_config.dialogue_language
        )
    } else {
        "An empty string. Narration is disabled for this project.".to_string()
    };

    let continuation = if existing_count > 0 {
        format!(
            "You are continuing a job. The first {} scenes have already been generated. \
             Your first scene_id MUST be {}.",
            existing_count, start_scene_id
        )
    } else {
        "This is a new job. Your first scene_id MUST be 1.".to_string()
    };

    format!(
        "You are an AI art director for creative and educational content. Break the given script \
         down into detailed scenes for an image generation model. Generate a JSON object with a \
         \"scenes\" array of exactly {} scene objects.\n\n\
         CRITICAL INSTRUCTIONS:\n\
         - LANGUAGE: except for the `dialogue` field, ALL string values MUST be in English.\n\
         - VISUALIZE CONCEPTS: translate the character's dialogue into simple, clear visuals; \
           the character is the main actor of every scene.\n\
         - CONTINUITY: keep style, color palette and character designs consistent across scenes. \
           The `style` field should almost always be \"{}\".\n\
         - CONTINUATION: {}\n\n\
         Each scene object requires `scene_id` (integer, sequential), `time` (string \"MM:SS\", \
         each scene is {} seconds, computed from the scene_id) and `prompt` (object with \
         scene_description, character_description, background_description, camera_shot, lighting, \
         color_palette, style, composition_notes, sound_effects, dialogue ({}), keywords (5-10 \
         English keywords), negative_prompts (things to avoid), aspect_ratio (must be \"16:9\") \
         and duration_seconds (must be {})).\n\n\
         Available characters (use for all character descriptions):\n{}",
        batch_size,
        video_config.style,
        continuation,
        scene_duration,
        dialogue_field,
        scene_duration,
        character_descriptions
    )
}

/// 角色变体的 responseSchema
fn variations_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "variations": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" }
                    },
                    "required": ["title", "description"]
                }
            }
        },
        "required": ["variations"]
    })
}

/// 分镜批次的 responseSchema（prompt 共 14 个字段）
fn scenes_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "scenes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "scene_id": { "type": "INTEGER" },
                        "time": { "type": "STRING" },
                        "prompt": {
                            "type": "OBJECT",
                            "properties": {
                                "scene_description": { "type": "STRING" },
                                "character_description": { "type": "STRING" },
                                "background_description": { "type": "STRING" },
                                "camera_shot": { "type": "STRING" },
                                "lighting": { "type": "STRING" },
                                "color_palette": { "type": "STRING" },
                                "style": { "type": "STRING" },
                                "composition_notes": { "type": "STRING" },
                                "sound_effects": { "type": "STRING" },
                                "dialogue": { "type": "STRING" },
                                "keywords": { "type": "ARRAY", "items": { "type": "STRING" } },
                                "negative_prompts": { "type": "ARRAY", "items": { "type": "STRING" } },
                                "aspect_ratio": { "type": "STRING" },
                                "duration_seconds": { "type": "INTEGER" }
                            },
                            "required": [
                                "scene_description", "character_description",
                                "background_description", "camera_shot", "lighting",
                                "color_palette", "style", "composition_notes",
                                "sound_effects", "dialogue", "keywords",
                                "negative_prompts", "aspect_ratio", "duration_seconds"
                            ]
                        }
                    },
                    "required": ["scene_id", "time", "prompt"]
                }
            }
        },
        "required": ["scenes"]
    })
}

/// 解析角色变体响应（缺少 variations 数组为硬失败）
pub(crate) fn parse_variations_response(text: &str) -> Result<Vec<CharacterVariation>> {
    let value: Value = serde_json::from_str(text.trim()).map_err(|e| {
        GenerationError::malformed("character_variations", format!("JSON 解析失败: {}", e))
    })?;

    let Some(variations) = value.get("variations").filter(|v| v.is_array()) else {
        return Err(GenerationError::malformed(
            "character_variations",
            "响应缺少 variations 数组",
        )
        .into());
    };

    let variations: Vec<CharacterVariation> = serde_json::from_value(variations.clone())
        .map_err(|e| {
            GenerationError::malformed("character_variations", format!("变体结构不符: {}", e))
        })?;

    debug!("解析到 {} 个角色变体", variations.len());
    Ok(variations)
}

/// 解析分镜批次响应
///
/// 顶层缺少 scenes 数组时软失败为空列表（调用方进度不推进，
/// 可从同一检查点重试）；数组存在但分镜结构不符则为硬失败。
pub(crate) fn parse_scenes_response(text: &str) -> Result<Vec<Scene>> {
    let value: Value = serde_json::from_str(text.trim()).map_err(|e| {
        GenerationError::malformed("scene_batch", format!("JSON 解析失败: {}", e))
    })?;

    let Some(scenes) = value.get("scenes").filter(|v| v.is_array()) else {
        warn!("响应结构不符合预期：未找到 scenes 数组，本批按空处理");
        return Ok(Vec::new());
    };

    let scenes: Vec<Scene> = serde_json::from_value(scenes.clone()).map_err(|e| {
        GenerationError::malformed("scene_batch", format!("分镜结构不符: {}", e))
    })?;

    Ok(scenes)
}
