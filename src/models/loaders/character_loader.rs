//! 角色导入文件解析
//!
//! 文本格式：重复的 `[Character Name: 名称]` 块，块首行为名称，
//! 其余行为角色描述正文。缺少名称或正文的块静默丢弃。

use crate::models::CharacterReference;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, warn};

/// 解析角色导入文本
pub fn parse_characters(content: &str) -> Vec<CharacterReference> {
    let mut characters = Vec::new();

    for block in content.split("[Character Name:") {
        if block.trim().is_empty() {
            continue;
        }

        let mut lines = block.lines();
        let name = lines
            .next()
            .map(|l| l.replace(']', "").trim().to_string())
            .unwrap_or_default();
        let prompt = lines.collect::<Vec<_>>().join("\n").trim().to_string();

        if name.is_empty() || prompt.is_empty() {
            warn!("跳过格式不完整的角色块");
            continue;
        }

        debug!("导入角色: {}", name);
        characters.push(CharacterReference::new(name, prompt));
    }

    characters
}

/// 从文件加载角色列表
pub fn load_characters_from_file(path: impl AsRef<Path>) -> Result<Vec<CharacterReference>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("读取角色文件失败: {}", path.display()))?;
    Ok(parse_characters(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_characters() {
        let content = "[Character Name: 月亮]\n\n一个温柔的卡通月亮，淡黄色，有着智慧的眼睛。\n[Character Name: 火山]\n\n一个急性子的卡通火山，红棕色，头顶冒烟。";
        let characters = parse_characters(content);
        assert_eq!(characters.len(), 2);
        assert_eq!(characters[0].name, "月亮");
        assert!(characters[0].prompt.contains("温柔"));
        assert_eq!(characters[1].name, "火山");
        // 每个角色分配独立 id
        assert_ne!(characters[0].id, characters[1].id);
    }

    #[test]
    fn test_malformed_blocks_are_dropped() {
        // 第一块缺正文，第二块缺名称，第三块完整
        let content = "[Character Name: 只有名字]\n\n[Character Name: ]\n\n有正文但没有名字\n[Character Name: 完整角色]\n\n这是描述。";
        let characters = parse_characters(content);
        assert_eq!(characters.len(), 1);
        assert_eq!(characters[0].name, "完整角色");
    }

    #[test]
    fn test_empty_content() {
        assert!(parse_characters("").is_empty());
        assert!(parse_characters("   \n  ").is_empty());
    }
}
