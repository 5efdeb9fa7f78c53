use anyhow::{bail, Context, Result};
use storyboard_gen::models::loaders::load_characters_from_file;
use storyboard_gen::orchestrator::ProjectController;
use storyboard_gen::utils::logging;
use storyboard_gen::Config;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    let mut controller = ProjectController::new(config.clone());
    logging::log_startup(
        &config.text_model_name,
        &config.image_model_name,
        controller.api_key_count(),
    );

    // 加载角色（可选）
    if let Ok(characters_file) = std::env::var("CHARACTERS_FILE") {
        let characters = load_characters_from_file(&characters_file)?;
        info!("🎭 已加载 {} 个角色", characters.len());
        for character in characters {
            controller.add_character(character.name, character.prompt);
        }
    }

    // 读取故事灵感
    let story_idea_file = std::env::var("STORY_IDEA_FILE")
        .context("请通过 STORY_IDEA_FILE 环境变量指定故事灵感文件")?;
    let story_idea = std::fs::read_to_string(&story_idea_file)
        .with_context(|| format!("读取故事灵感文件失败: {}", story_idea_file))?;
    if story_idea.trim().is_empty() {
        bail!("故事灵感文件为空: {}", story_idea_file);
    }
    controller.set_story_idea(&story_idea);
    info!(
        "💡 故事灵感: {}",
        logging::truncate_text(story_idea.trim(), 60)
    );

    // 生成脚本与全部分镜
    controller.generate_script().await?;
    controller.generate_full_storyboard().await?;

    // 导出
    let output_dir = config.output_dir.clone();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("创建导出目录失败: {}", output_dir))?;

    let prompts_path = format!("{}/prompts.txt", output_dir);
    controller.export_prompts(&prompts_path)?;

    // 配图（可选，需要至少一个带参考图的角色）
    let mut image_count = 0;
    let generate_images = std::env::var("GENERATE_IMAGES")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);
    if generate_images {
        match controller.generate_all_scene_images().await {
            Ok(count) => {
                image_count = count;
                if count > 0 {
                    let archive_path = format!("{}/scene_images.zip", output_dir);
                    controller.export_images(&archive_path)?;
                }
            }
            Err(err) => warn!("⚠️ 配图生成未完成: {}", err),
        }
    }

    logging::print_final_stats(controller.state().scenes.len(), image_count, &output_dir);

    Ok(())
}
