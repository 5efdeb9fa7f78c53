//! 导出服务 - 业务能力层
//!
//! 两种产物：
//! - 提示词文本：所有分镜的结构化提示词按 scene_id 顺序拼成一个 .txt；
//! - 图片压缩包：已生成配图的分镜打包为 zip，条目名 `scene_{id}.png`。
//!
//! 条目名中保留 scene_id，解包后仍能还原图片与分镜的对应关系。

use crate::clients::gemini_client::parse_data_url;
use crate::models::Scene;
use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;
use zip::write::SimpleFileOptions;

/// 导出服务
pub struct ExportService;

impl ExportService {
    /// 渲染提示词导出文本
    ///
    /// 每个分镜一个小节：`场景 {id} ({time}):` 加上格式化后的提示词 JSON，
    /// 小节之间以空行分隔。
    pub fn render_prompts(scenes: &[Scene]) -> Result<String> {
        let mut sections = Vec::with_capacity(scenes.len());
        for scene in scenes {
            let prompt_json = serde_json::to_string_pretty(&scene.prompt)?;
            sections.push(format!(
                "场景 {} ({}):\n{}",
                scene.scene_id, scene.time, prompt_json
            ));
        }
        Ok(sections.join("\n\n"))
    }

    /// 导出提示词文本文件
    pub fn export_prompts(scenes: &[Scene], path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = Self::render_prompts(scenes)?;
        std::fs::write(path, content)
            .with_context(|| format!("写入提示词文件失败: {}", path.display()))?;
        info!("📄 已导出 {} 个分镜提示词 -> {}", scenes.len(), path.display());
        Ok(())
    }

    /// 导出图片压缩包
    ///
    /// 只打包已有配图的分镜，条目名为 `scene_{id}.png`。
    ///
    /// # 返回
    /// 返回写入压缩包的图片数量；没有任何分镜带配图时报错而不是
    /// 生成空压缩包。
    pub fn export_images_archive(scenes: &[Scene], path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();

        let with_images: Vec<&Scene> = scenes
            .iter()
            .filter(|s| s.image_data.is_some())
            .collect();
        if with_images.is_empty() {
            bail!("没有可导出的分镜配图");
        }

        let file = File::create(path)
            .with_context(|| format!("创建压缩包失败: {}", path.display()))?;
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        let mut count = 0;
        for scene in with_images {
            let data_url = scene.image_data.as_deref().unwrap_or_default();
            let (_, encoded) = parse_data_url(data_url)
                .with_context(|| format!("场景 {} 的图片数据无效", scene.scene_id))?;
            let bytes = BASE64
                .decode(encoded.as_bytes())
                .with_context(|| format!("场景 {} 的图片解码失败", scene.scene_id))?;

            writer.start_file(image_entry_name(scene.scene_id), options)?;
            writer.write_all(&bytes)?;
            count += 1;
        }

        writer.finish()?;
        info!("🗜️ 已导出 {} 张分镜配图 -> {}", count, path.display());
        Ok(count)
    }

    /// 从压缩包读回 (scene_id, PNG 字节) 列表
    ///
    /// 不符合 `scene_{id}.png` 命名的条目直接跳过。
    pub fn import_images_archive(path: impl AsRef<Path>) -> Result<Vec<(u32, Vec<u8>)>> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("打开压缩包失败: {}", path.display()))?;
        let mut archive = zip::ZipArchive::new(file)?;

        let mut images = Vec::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let Some(scene_id) = scene_id_from_entry_name(entry.name()) else {
                continue;
            };
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            images.push((scene_id, bytes));
        }

        images.sort_by_key(|(scene_id, _)| *scene_id);
        Ok(images)
    }
}

/// 压缩包条目名：scene_{id}.png
fn image_entry_name(scene_id: u32) -> String {
    format!("scene_{}.png", scene_id)
}

/// 从条目名还原 scene_id
fn scene_id_from_entry_name(name: &str) -> Option<u32> {
    name.strip_prefix("scene_")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}
