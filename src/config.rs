/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 文本生成模型名称
    pub text_model_name: String,
    /// 图片生成模型名称
    pub image_model_name: String,
    /// Gemini API 基础 URL
    pub api_base_url: String,
    /// API 版本
    pub api_version: String,
    /// 每批生成的分镜数量
    pub scenes_per_batch: usize,
    /// 单个分镜时长（秒）
    pub scene_duration_seconds: u32,
    /// 单次调用的最大尝试次数
    pub max_retries: usize,
    /// 首次重试延迟（毫秒）
    pub initial_retry_delay_ms: u64,
    /// API Key 列表文件路径
    pub api_keys_file: String,
    /// 导出文件目录
    pub output_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            text_model_name: "gemini-2.5-pro".to_string(),
            image_model_name: "gemini-2.5-flash-image".to_string(),
            api_base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_version: "v1beta".to_string(),
            scenes_per_batch: 10,
            scene_duration_seconds: 8,
            max_retries: 3,
            initial_retry_delay_ms: 1000,
            api_keys_file: "api_keys.json".to_string(),
            output_dir: "output".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            text_model_name: std::env::var("TEXT_MODEL_NAME").unwrap_or(default.text_model_name),
            image_model_name: std::env::var("IMAGE_MODEL_NAME").unwrap_or(default.image_model_name),
            api_base_url: std::env::var("API_BASE_URL").unwrap_or(default.api_base_url),
            api_version: std::env::var("API_VERSION").unwrap_or(default.api_version),
            scenes_per_batch: std::env::var("SCENES_PER_BATCH").ok().and_then(|v| v.parse().ok()).unwrap_or(default.scenes_per_batch),
            scene_duration_seconds: std::env::var("SCENE_DURATION_SECONDS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.scene_duration_seconds),
            max_retries: std::env::var("MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            initial_retry_delay_ms: std::env::var("INITIAL_RETRY_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.initial_retry_delay_ms),
            api_keys_file: std::env::var("API_KEYS_FILE").unwrap_or(default.api_keys_file),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }
}
