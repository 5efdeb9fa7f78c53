//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层把"用户意图"翻译成对能力层的调用序列，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `project` - 项目控制器
//! - 持有项目状态（角色、灵感、脚本、分镜、进度）
//! - 把每个用户意图映射为一次状态迁移
//! - 统一收敛失败路径（清加载标志、记录错误文案）
//!
//! ### `task_runner` - Key 轮换执行器
//! - 在 Key 列表上重新提交整个任务
//! - 配额耗尽时前进 Key 下标，耗尽全部 Key 后终止
//!
//! ### `storyboard` - 分镜批次推进器
//! - 批次算术（预期总数、尾批收缩）
//! - 批次结果归并与完成判定
//!
//! ## 层次关系
//!
//! ```text
//! project (状态 + 意图)
//!     ↓
//! task_runner (Key 轮换) + storyboard (批次推进)
//!     ↓
//! services (能力层：生成 / 重试 / 分类 / 导出 / Key 管理)
//!     ↓
//! clients (基础设施：Gemini HTTP 客户端)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：project 管状态，task_runner 管轮换，storyboard 管批次
//! 2. **向下依赖**：编排层 → services → clients
//! 3. **重试与轮换分层**：瞬态错误在能力层重试，配额错误在本层轮换

pub mod project;
pub mod storyboard;
pub mod task_runner;

// 重新导出主要类型
pub use project::{ProjectController, ProjectState};
pub use storyboard::{BatchOutcome, StoryboardOrchestrator};
pub use task_runner::run_with_rotation;
