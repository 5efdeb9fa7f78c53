//! 分镜批次推进 - 编排层
//!
//! 分镜按固定大小的批次生成，可从任意检查点续传。
//! 本模块只做纯粹的批次算术与结果归并，不发起任何远程调用：
//! - 预期总数 = round(视频总时长 / 单镜时长)；
//! - 下一批大小 = min(批次大小, 总数 - 已有数)，尾批按余量收缩；
//! - 归并后的分镜列表始终按 scene_id 排序。

use crate::config::Config;
use crate::models::{GenerationProgress, Scene};
use crate::services::generation_service::expected_scene_count;
use tracing::info;

/// 一个批次归并后的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// 还有后续批次
    Continue(GenerationProgress),
    /// 已达到预期总数
    Complete(GenerationProgress),
}

impl BatchOutcome {
    pub fn progress(&self) -> GenerationProgress {
        match self {
            BatchOutcome::Continue(p) | BatchOutcome::Complete(p) => *p,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, BatchOutcome::Complete(_))
    }
}

/// 分镜批次推进器
pub struct StoryboardOrchestrator {
    scenes_per_batch: usize,
    scene_duration_seconds: u32,
}

impl StoryboardOrchestrator {
    pub fn new(config: &Config) -> Self {
        Self {
            scenes_per_batch: config.scenes_per_batch,
            scene_duration_seconds: config.scene_duration_seconds,
        }
    }

    /// 预期分镜总数
    pub fn expected_total(&self, video_duration_seconds: u32) -> usize {
        expected_scene_count(video_duration_seconds, self.scene_duration_seconds)
    }

    /// 下一批应请求的分镜数（尾批按余量收缩，已完成时为 0）
    pub fn next_batch_size(&self, current: usize, total: usize) -> usize {
        self.scenes_per_batch.min(total.saturating_sub(current))
    }

    /// 归并一批新分镜
    ///
    /// 追加后按 scene_id 重新排序，并判断是否已完成。
    /// 空批（上游软失败）不推进进度，外层可从同一检查点重试。
    pub fn accumulate(
        &self,
        scenes: &mut Vec<Scene>,
        new_scenes: Vec<Scene>,
        total: usize,
    ) -> BatchOutcome {
        scenes.extend(new_scenes);
        scenes.sort_by_key(|s| s.scene_id);

        let progress = GenerationProgress {
            current: scenes.len(),
            total,
        };

        if progress.current >= total {
            info!("🎬 分镜生成完成: 共 {} 个", progress.current);
            BatchOutcome::Complete(progress)
        } else {
            info!("🎬 分镜进度: {}/{}", progress.current, progress.total);
            BatchOutcome::Continue(progress)
        }
    }
}
