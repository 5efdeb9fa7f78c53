//! 项目控制器 - 编排层
//!
//! 持有完整的项目状态（角色、灵感、脚本、分镜、进度），
//! 把用户意图翻译成对能力层的调用序列：
//!
//! ```text
//! 用户意图 → ProjectController
//!     ↓ 远程意图统一经 run_with_rotation（Key 轮换）
//! GenerationService（重试 + 解析 + 错误分类）
//!     ↓
//! GeminiClient
//! ```
//!
//! 失败路径统一收敛：清除加载标志、记录面向用户的错误文案；
//! 未配置 Key 时额外置起 `needs_api_key_config`，提示先补配置。

use crate::config::Config;
use crate::error::{GenerationError, GenerationResult};
use crate::models::{
    CharacterReference, CharacterVariation, GenerationProgress, Scene, VideoConfig,
};
use crate::orchestrator::storyboard::{BatchOutcome, StoryboardOrchestrator};
use crate::orchestrator::task_runner::run_with_rotation;
use crate::services::{ApiKeyManager, ExportService, GenerationService};
use anyhow::{bail, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// 项目名称的最大长度（从灵感首行截取）
const PROJECT_NAME_MAX_CHARS: usize = 50;

/// 连续空批（响应缺 scenes 数组）超过此次数则中止整体生成
const MAX_CONSECUTIVE_EMPTY_BATCHES: usize = 3;

/// 项目状态
///
/// 单一数据源：所有展示与导出都从这里读取。
#[derive(Debug, Clone)]
pub struct ProjectState {
    pub project_name: String,
    pub characters: Vec<CharacterReference>,
    pub story_idea: String,
    /// 动画风格标识
    pub animation_style: String,
    /// 故事基调标识
    pub story_style: String,
    pub script: String,
    pub video_config: VideoConfig,
    pub scenes: Vec<Scene>,
    pub progress: GenerationProgress,
    pub generation_complete: bool,
    pub is_loading: bool,
    pub status_message: String,
    /// 最近一次失败的用户可读文案
    pub last_error: Option<String>,
    /// 置起时表示需要先配置 API Key
    pub needs_api_key_config: bool,
    /// 最近一次请求的角色设定变体建议
    pub suggested_variations: Vec<CharacterVariation>,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            characters: Vec::new(),
            story_idea: String::new(),
            animation_style: "cute_cartoon".to_string(),
            story_style: "funny".to_string(),
            script: String::new(),
            video_config: VideoConfig::default(),
            scenes: Vec::new(),
            progress: GenerationProgress::default(),
            generation_complete: false,
            is_loading: false,
            status_message: String::new(),
            last_error: None,
            needs_api_key_config: false,
            suggested_variations: Vec::new(),
        }
    }
}

/// 项目控制器
pub struct ProjectController {
    config: Config,
    service: GenerationService,
    key_manager: ApiKeyManager,
    storyboard: StoryboardOrchestrator,
    state: ProjectState,
    cancel_image_sweep: Arc<AtomicBool>,
}

impl ProjectController {
    /// 创建控制器并从本地文件加载 API Key
    pub fn new(config: Config) -> Self {
        let key_manager = ApiKeyManager::load(&config.api_keys_file);
        Self::with_key_manager(config, key_manager)
    }

    /// 以指定的 Key 管理器创建控制器
    pub fn with_key_manager(config: Config, key_manager: ApiKeyManager) -> Self {
        Self {
            service: GenerationService::new(&config),
            storyboard: StoryboardOrchestrator::new(&config),
            key_manager,
            config,
            state: ProjectState::default(),
            cancel_image_sweep: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    /// 已配置的 API Key 数量
    pub fn api_key_count(&self) -> usize {
        self.key_manager.len()
    }

    /// 更新视频配置
    ///
    /// 时长/格式/台词设置变化都会使已生成的脚本与分镜失效。
    pub fn set_video_config(&mut self, video_config: VideoConfig) {
        self.state.video_config = video_config;
        self.clear_generated_outputs();
    }

    /// 图片批量生成的取消句柄（可跨线程置起）
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel_image_sweep.clone()
    }

    // ---------- 角色管理 ----------

    /// 添加角色
    ///
    /// 角色集合变化会使已生成的脚本与分镜失效，一并清除。
    pub fn add_character(&mut self, name: impl Into<String>, prompt: impl Into<String>) -> String {
        let character = CharacterReference::new(name, prompt);
        let id = character.id.clone();
        self.state.characters.push(character);
        self.clear_generated_outputs();
        id
    }

    /// 更新角色名称与描述
    pub fn update_character(&mut self, id: &str, name: &str, prompt: &str) -> Result<()> {
        let Some(character) = self.state.characters.iter_mut().find(|c| c.id == id) else {
            bail!("角色不存在: {}", id);
        };
        character.name = name.to_string();
        character.prompt = prompt.to_string();
        self.clear_generated_outputs();
        Ok(())
    }

    /// 删除角色
    pub fn delete_character(&mut self, id: &str) -> Result<()> {
        let before = self.state.characters.len();
        self.state.characters.retain(|c| c.id != id);
        if self.state.characters.len() == before {
            bail!("角色不存在: {}", id);
        }
        self.clear_generated_outputs();
        Ok(())
    }

    /// 设置角色参考图（data URL）
    pub fn set_character_image(&mut self, id: &str, image_data_url: &str) -> Result<()> {
        let Some(character) = self.state.characters.iter_mut().find(|c| c.id == id) else {
            bail!("角色不存在: {}", id);
        };
        character.image_data = Some(image_data_url.to_string());
        Ok(())
    }

    // ---------- 灵感与脚本 ----------

    /// 设置故事灵感，并从首行推导项目名称
    pub fn set_story_idea(&mut self, idea: &str) {
        self.state.story_idea = idea.to_string();
        self.state.project_name = derive_project_name(idea);
        self.clear_generated_outputs();
    }

    /// 请求一条故事灵感建议
    pub async fn suggest_story_idea(&mut self) -> GenerationResult<()> {
        self.begin("💡 正在生成故事灵感...");

        let animation_style = self.state.animation_style.clone();
        let story_style = self.state.story_style.clone();
        let descriptions = self.character_descriptions();
        let service = &self.service;

        let result = run_with_rotation(&mut self.key_manager, |api_key| {
            let animation_style = animation_style.clone();
            let story_style = story_style.clone();
            let descriptions = descriptions.clone();
            async move {
                service
                    .story_idea(&animation_style, &story_style, &descriptions, &api_key)
                    .await
            }
        })
        .await;

        match result {
            Ok(idea) => {
                self.set_story_idea(&idea);
                self.finish("💡 故事灵感已生成");
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// 请求角色设定变体建议，结果存入 `suggested_variations`
    pub async fn suggest_character_variations(
        &mut self,
        character_id: &str,
    ) -> GenerationResult<()> {
        let Some(character) = self.state.characters.iter().find(|c| c.id == character_id) else {
            return Err(GenerationError::Generic {
                context: "character_variations".to_string(),
                message: format!("角色不存在: {}", character_id),
            });
        };
        let character_name = character.name.clone();

        self.begin("🎭 正在生成角色设定变体...");

        let animation_style = self.state.animation_style.clone();
        let story_style = self.state.story_style.clone();
        let service = &self.service;

        let result = run_with_rotation(&mut self.key_manager, |api_key| {
            let character_name = character_name.clone();
            let animation_style = animation_style.clone();
            let story_style = story_style.clone();
            async move {
                service
                    .character_variations(&character_name, &animation_style, &story_style, &api_key)
                    .await
            }
        })
        .await;

        match result {
            Ok(variations) => {
                self.state.suggested_variations = variations;
                self.finish("🎭 角色设定变体已生成");
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// 采纳一条变体建议作为角色描述
    pub fn apply_character_variation(&mut self, character_id: &str, index: usize) -> Result<()> {
        let Some(variation) = self.state.suggested_variations.get(index).cloned() else {
            bail!("变体序号越界: {}", index);
        };
        let Some(character) = self
            .state
            .characters
            .iter_mut()
            .find(|c| c.id == character_id)
        else {
            bail!("角色不存在: {}", character_id);
        };
        character.prompt = variation.description;
        self.state.suggested_variations.clear();
        self.clear_generated_outputs();
        Ok(())
    }

    /// 根据角色参考图生成角色描述
    pub async fn generate_character_prompt_from_image(
        &mut self,
        character_id: &str,
    ) -> GenerationResult<()> {
        let image_data_url = match self
            .state
            .characters
            .iter()
            .find(|c| c.id == character_id)
            .and_then(|c| c.image_data.clone())
        {
            Some(url) => url,
            None => {
                return Err(GenerationError::Generic {
                    context: "character_prompt_from_image".to_string(),
                    message: "该角色没有参考图".to_string(),
                })
            }
        };

        self.begin("🖼️ 正在根据参考图生成角色描述...");

        let service = &self.service;
        let result = run_with_rotation(&mut self.key_manager, |api_key| {
            let image_data_url = image_data_url.clone();
            async move {
                service
                    .character_prompt_from_image(&image_data_url, &api_key)
                    .await
            }
        })
        .await;

        match result {
            Ok(prompt) => {
                if let Some(character) = self
                    .state
                    .characters
                    .iter_mut()
                    .find(|c| c.id == character_id)
                {
                    character.prompt = prompt;
                }
                self.clear_generated_outputs();
                self.finish("🖼️ 角色描述已生成");
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// 根据故事灵感生成完整脚本
    ///
    /// 成功后清空已有分镜（脚本变了，旧分镜作废）。
    pub async fn generate_script(&mut self) -> GenerationResult<()> {
        if self.state.story_idea.trim().is_empty() {
            return Err(GenerationError::Generic {
                context: "script".to_string(),
                message: "请先填写或生成故事灵感".to_string(),
            });
        }

        self.begin("📝 正在生成脚本...");

        let story_idea = self.state.story_idea.clone();
        let video_config = self.state.video_config.clone();
        let descriptions = self.character_descriptions();
        let service = &self.service;

        let result = run_with_rotation(&mut self.key_manager, |api_key| {
            let story_idea = story_idea.clone();
            let video_config = video_config.clone();
            let descriptions = descriptions.clone();
            async move {
                service
                    .script(&story_idea, &video_config, &descriptions, &api_key)
                    .await
            }
        })
        .await;

        match result {
            Ok(script) => {
                self.state.script = script;
                self.state.scenes.clear();
                self.state.progress = GenerationProgress::default();
                self.state.generation_complete = false;
                self.finish("📝 脚本已生成");
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    // ---------- 分镜 ----------

    /// 请求下一批分镜并归并进项目状态
    ///
    /// 可从任意检查点（已有 N 个分镜）继续；空批不推进进度。
    pub async fn generate_storyboard_batch(&mut self) -> GenerationResult<BatchOutcome> {
        if self.state.script.trim().is_empty() {
            return Err(GenerationError::Generic {
                context: "scene_batch".to_string(),
                message: "请先生成脚本".to_string(),
            });
        }

        let total = self
            .storyboard
            .expected_total(self.state.video_config.duration);
        let existing = self.state.scenes.len();
        let batch_size = self.storyboard.next_batch_size(existing, total);

        if batch_size == 0 {
            let progress = GenerationProgress {
                current: existing,
                total,
            };
            self.state.progress = progress;
            self.state.generation_complete = true;
            return Ok(BatchOutcome::Complete(progress));
        }

        self.begin(&format!(
            "🎬 正在生成分镜 {}-{} / 共 {}...",
            existing + 1,
            existing + batch_size,
            total
        ));

        let script = self.state.script.clone();
        let video_config = self.state.video_config.clone();
        let descriptions = self.character_descriptions();
        let service = &self.service;

        let result = run_with_rotation(&mut self.key_manager, |api_key| {
            let script = script.clone();
            let video_config = video_config.clone();
            let descriptions = descriptions.clone();
            async move {
                service
                    .scene_batch(
                        &script,
                        &video_config,
                        &descriptions,
                        existing,
                        batch_size,
                        &api_key,
                    )
                    .await
            }
        })
        .await;

        match result {
            Ok(new_scenes) => {
                let outcome = self
                    .storyboard
                    .accumulate(&mut self.state.scenes, new_scenes, total);
                self.state.progress = outcome.progress();
                self.state.generation_complete = outcome.is_complete();
                self.finish(&format!(
                    "🎬 分镜进度 {}/{}",
                    self.state.progress.current, self.state.progress.total
                ));
                Ok(outcome)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// 批次循环直到分镜全部生成
    ///
    /// 连续多个空批视为模型持续返回异常结构，中止而不是死循环。
    pub async fn generate_full_storyboard(&mut self) -> GenerationResult<()> {
        let mut consecutive_empty = 0;

        loop {
            let before = self.state.scenes.len();
            let outcome = self.generate_storyboard_batch().await?;

            if outcome.is_complete() {
                return Ok(());
            }

            if self.state.scenes.len() == before {
                consecutive_empty += 1;
                warn!(
                    "⚠️ 本批未返回任何分镜 (连续 {}/{})",
                    consecutive_empty, MAX_CONSECUTIVE_EMPTY_BATCHES
                );
                if consecutive_empty >= MAX_CONSECUTIVE_EMPTY_BATCHES {
                    return Err(self.fail(GenerationError::malformed(
                        "scene_batch",
                        "模型连续多批未返回分镜",
                    )));
                }
            } else {
                consecutive_empty = 0;
            }
        }
    }

    // ---------- 分镜配图 ----------

    /// 为指定分镜生成配图
    ///
    /// 以第一个带参考图的角色作为风格参照。
    pub async fn generate_scene_image(&mut self, scene_id: u32) -> GenerationResult<()> {
        let Some(reference) = self
            .state
            .characters
            .iter()
            .find_map(|c| c.image_data.clone())
        else {
            return Err(GenerationError::Generic {
                context: "scene_image".to_string(),
                message: "没有带参考图的角色，无法保证画面风格一致".to_string(),
            });
        };

        let prompt = match self
            .state
            .scenes
            .iter_mut()
            .find(|s| s.scene_id == scene_id)
        {
            Some(scene) => {
                scene.is_generating_image = true;
                scene.prompt.clone()
            }
            None => {
                return Err(GenerationError::Generic {
                    context: "scene_image".to_string(),
                    message: format!("分镜不存在: {}", scene_id),
                })
            }
        };

        let service = &self.service;
        let result = run_with_rotation(&mut self.key_manager, |api_key| {
            let prompt = prompt.clone();
            let reference = reference.clone();
            async move { service.scene_image(&prompt, &reference, &api_key).await }
        })
        .await;

        let scene = self
            .state
            .scenes
            .iter_mut()
            .find(|s| s.scene_id == scene_id);

        match result {
            Ok(image_data_url) => {
                if let Some(scene) = scene {
                    scene.image_data = Some(image_data_url);
                    scene.is_generating_image = false;
                }
                info!("🖼️ 场景 {} 配图已生成", scene_id);
                Ok(())
            }
            Err(err) => {
                if let Some(scene) = scene {
                    scene.is_generating_image = false;
                }
                Err(self.fail(err))
            }
        }
    }

    /// 顺序为所有缺图分镜生成配图
    ///
    /// 每个分镜开始前检查取消标志，取消即时生效（已生成的保留）。
    ///
    /// # 返回
    /// 返回本次实际生成的图片数量。
    pub async fn generate_all_scene_images(&mut self) -> GenerationResult<usize> {
        self.cancel_image_sweep.store(false, Ordering::SeqCst);

        let pending: Vec<u32> = self
            .state
            .scenes
            .iter()
            .filter(|s| s.image_data.is_none())
            .map(|s| s.scene_id)
            .collect();

        let mut generated = 0;
        for scene_id in pending {
            if self.cancel_image_sweep.load(Ordering::SeqCst) {
                info!("⏹️ 配图批量生成已取消 (已完成 {} 张)", generated);
                break;
            }
            self.generate_scene_image(scene_id).await?;
            generated += 1;
        }

        Ok(generated)
    }

    /// 请求取消正在进行的配图批量生成
    pub fn request_cancel_image_sweep(&self) {
        self.cancel_image_sweep.store(true, Ordering::SeqCst);
    }

    // ---------- Key 与项目管理 ----------

    /// 保存新的 API Key 列表
    pub fn save_api_keys(&mut self, keys: Vec<String>) -> Result<()> {
        self.key_manager.save_keys(keys)?;
        self.state.needs_api_key_config = false;
        self.state.last_error = None;
        Ok(())
    }

    /// 重置整个项目（保留 Key 列表，活动下标归零）
    pub fn reset(&mut self) {
        self.state = ProjectState::default();
        self.key_manager.reset();
        self.cancel_image_sweep.store(false, Ordering::SeqCst);
        info!("🔄 项目已重置");
    }

    // ---------- 导出 ----------

    /// 导出全部分镜提示词为文本文件
    pub fn export_prompts(&self, path: impl AsRef<Path>) -> Result<()> {
        if self.state.scenes.is_empty() {
            bail!("没有可导出的分镜");
        }
        ExportService::export_prompts(&self.state.scenes, path)
    }

    /// 导出已生成的分镜配图为 zip 压缩包
    pub fn export_images(&self, path: impl AsRef<Path>) -> Result<usize> {
        ExportService::export_images_archive(&self.state.scenes, path)
    }

    // ---------- 内部辅助 ----------

    /// 所有角色的描述拼接，供提示词引用
    fn character_descriptions(&self) -> String {
        if self.state.characters.is_empty() {
            return "(no predefined characters)".to_string();
        }
        self.state
            .characters
            .iter()
            .map(|c| format!("[{}]: {}", c.name, c.prompt))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 角色或灵感变更后，已生成的下游产物作废
    fn clear_generated_outputs(&mut self) {
        self.state.script.clear();
        self.state.scenes.clear();
        self.state.progress = GenerationProgress::default();
        self.state.generation_complete = false;
    }

    fn begin(&mut self, status: &str) {
        self.state.is_loading = true;
        self.state.last_error = None;
        self.state.status_message = status.to_string();
        info!("{}", status);
    }

    fn finish(&mut self, status: &str) {
        self.state.is_loading = false;
        self.state.status_message = status.to_string();
        info!("{}", status);
    }

    /// 失败路径统一收敛
    fn fail(&mut self, err: GenerationError) -> GenerationError {
        self.state.is_loading = false;
        self.state.status_message.clear();
        self.state.last_error = Some(err.to_string());
        if matches!(err, GenerationError::NoApiKeys) {
            self.state.needs_api_key_config = true;
        }
        warn!("❌ {}", err);
        err
    }
}

/// 从故事灵感首行推导项目名称（截断到固定长度）
fn derive_project_name(idea: &str) -> String {
    let first_line = idea.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let trimmed = first_line.trim();
    if trimmed.chars().count() > PROJECT_NAME_MAX_CHARS {
        trimmed.chars().take(PROJECT_NAME_MAX_CHARS).collect()
    } else {
        trimmed.to_string()
    }
}
