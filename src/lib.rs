//! # Storyboard Gen
//!
//! 一个用角色人设驱动、批量生成讲解视频脚本与分镜的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 基础设施层（Clients）
//! - `clients/` - 持有 HTTP 连接，只暴露 generateContent 调用能力
//! - `GeminiClient` - 唯一的远程端点 owner，负责响应骨架解析
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个生成任务一个类型化函数
//! - `GenerationService` - 灵感 / 脚本 / 分镜批次 / 配图生成能力
//! - `ApiKeyManager` - Key 列表持久化与下标推进能力
//! - `ExportService` - 提示词文本与图片压缩包导出能力
//! - `retry` / `classifier` - 重试策略与错误分类
//!
//! ### ③ 编排层（Orchestrator）
//! - `orchestrator/project` - 项目控制器，持有状态并映射用户意图
//! - `orchestrator/task_runner` - Key 轮换执行器
//! - `orchestrator/storyboard` - 分镜批次推进器
//!
//! ## 关键不变量
//!
//! - 配额错误从不在重试层消耗尝试次数，只触发 Key 轮换
//! - Key 下标单调前进，从不回绕
//! - 分镜列表始终按 scene_id 排序，空批不推进进度

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{GenerationError, GenerationResult};
pub use models::{
    CharacterReference, CharacterVariation, GenerationProgress, Scene, ScenePrompt, VideoConfig,
    VideoFormat,
};
pub use orchestrator::{BatchOutcome, ProjectController, ProjectState};
pub use services::{ApiKeyManager, ExportService, GenerationService};
