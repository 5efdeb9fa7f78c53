/// 日志工具模块
///
/// 提供日志初始化与格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志订阅器
///
/// # 参数
/// - `verbose`: 为 true 时默认级别为 debug，否则为 info；
///   `RUST_LOG` 环境变量始终优先。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `text_model`: 文本生成模型名称
/// - `image_model`: 图片生成模型名称
/// - `key_count`: 已配置的 API Key 数量
pub fn log_startup(text_model: &str, image_model: &str, key_count: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 分镜脚本生成模式");
    info!("📝 文本模型: {}", text_model);
    info!("🖼️ 图片模型: {}", image_model);
    info!("🔑 API Key 数量: {}", key_count);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `scene_count`: 生成的分镜数量
/// - `image_count`: 生成的配图数量
/// - `output_dir`: 导出目录
pub fn print_final_stats(scene_count: usize, image_count: usize, output_dir: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("🎬 分镜: {} 个", scene_count);
    info!("🖼️ 配图: {} 张", image_count);
    info!("{}", "=".repeat(60));
    info!("\n导出文件已保存至: {}", output_dir);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("短文本", 10), "短文本");
        assert_eq!(truncate_text("一二三四五", 3), "一二三...");
    }
}
