//! Critique prompt construction.
//!
//! A prompt is one style-specific emphasis block followed by a shared
//! directive listing the analysis dimensions and the JSON schema the
//! response must follow. Keys stay English in every language; only string
//! values are localized.

use crate::llm::schema;
use crate::types::{CritiqueStyle, Language};

/// Builds critique prompts for a fixed output language.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder {
    language: Language,
}

impl PromptBuilder {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Full prompt text for `style`. Deterministic.
    pub fn build_prompt(&self, style: CritiqueStyle) -> String {
        let schema = schema::prompt_schema().to_string();
        let emphasis = emphasis(self.language, style);
        match self.language {
            Language::Chinese => format!(
                "你是一位世界级的摄影评论家。请分析这张照片。\n\
                 {emphasis}\n\
                 \n\
                 请提供详细的分析报告，包含以下内容：\n\
                 1. 一个引人注目的照片标题 (中文)。\n\
                 2. 0-100的评分，包含：总体评分、构图、光影、创意和技巧。\n\
                 3. 一段总结段落 (中文)。\n\
                 4. 主要优点（3-5项，中文）。\n\
                 5. 缺点/不足（3-5项，中文）。\n\
                 6. 具体的改进建议（3-5项，中文）。\n\
                 7. 关于技巧和构图的深度分析 (中文)。\n\
                 \n\
                 重要：请严格按照以下 JSON 结构返回结果。\n\
                 JSON 的 Key 必须保持英文（如 \"overallScore\", \"summary\"），\
                 但所有的字符串 Value 必须使用中文（简体中文）。\n\
                 {schema}\n"
            ),
            Language::English => format!(
                "Analyze this photograph as a world-class photography critic.\n\
                 {emphasis}\n\
                 \n\
                 Provide a detailed breakdown including:\n\
                 1. A catchy title for the photo.\n\
                 2. Scores from 0-100 for overall, composition, lighting, creativity, and technique.\n\
                 3. A summary paragraph.\n\
                 4. Key strengths (3-5 items).\n\
                 5. Weaknesses (3-5 items).\n\
                 6. Specific actionable improvements (3-5 items).\n\
                 7. Deep dive analysis on technique and composition.\n\
                 \n\
                 Important: return the result strictly in the following JSON structure, \
                 with exactly these keys (e.g. \"overallScore\", \"summary\"). \
                 All string values must be in English.\n\
                 {schema}\n"
            ),
        }
    }
}

/// The style-specific emphasis block.
pub fn emphasis(language: Language, style: CritiqueStyle) -> &'static str {
    match (language, style) {
        (Language::Chinese, CritiqueStyle::Technical) => {
            "请重点关注曝光、锐度、噪点、镜头选择、色差和动态范围。评分标准要严格。"
        }
        (Language::Chinese, CritiqueStyle::Artistic) => {
            "请重点关注氛围、情感、色彩理论、故事性和视觉冲击力。如果能增加作品特色，可以忽略微小的技术瑕疵。"
        }
        (Language::Chinese, CritiqueStyle::Social) => {
            "请重点关注视觉吸引力、易传播性、裁剪潜力和当前趋势。保持语调生动有趣。"
        }
        (Language::Chinese, CritiqueStyle::Balanced) => {
            "提供兼顾技术执行和艺术价值的平衡点评。建议要具有建设性。"
        }
        (Language::English, CritiqueStyle::Technical) => {
            "Focus heavily on exposure, sharpness, noise, lens choice, chromatic aberration, \
             and dynamic range. Be strict with scoring."
        }
        (Language::English, CritiqueStyle::Artistic) => {
            "Focus on mood, emotion, color theory, storytelling, and visual impact. \
             Ignore minor technical imperfections if they add character."
        }
        (Language::English, CritiqueStyle::Social) => {
            "Focus on visual hook, shareability, crop potential, and current trends. \
             Keep tone engaging."
        }
        (Language::English, CritiqueStyle::Balanced) => {
            "Provide a balanced critique covering both technical execution and artistic merit. \
             Be constructive."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANGUAGES: [Language; 2] = [Language::Chinese, Language::English];

    #[test]
    fn test_prompt_is_deterministic() {
        for language in LANGUAGES {
            let builder = PromptBuilder::new(language);
            for style in CritiqueStyle::ALL {
                assert_eq!(builder.build_prompt(style), builder.build_prompt(style));
            }
        }
    }

    #[test]
    fn test_prompt_contains_own_emphasis_exactly_once() {
        for language in LANGUAGES {
            let builder = PromptBuilder::new(language);
            for style in CritiqueStyle::ALL {
                let prompt = builder.build_prompt(style);
                assert_eq!(prompt.matches(emphasis(language, style)).count(), 1);
                for other in CritiqueStyle::ALL.into_iter().filter(|s| *s != style) {
                    assert!(!prompt.contains(emphasis(language, other)));
                }
            }
        }
    }

    #[test]
    fn test_prompt_embeds_schema_keys() {
        for language in LANGUAGES {
            let prompt = PromptBuilder::new(language).build_prompt(CritiqueStyle::Balanced);
            for (field, _) in schema::FIELDS {
                assert!(prompt.contains(&format!("\"{field}\"")), "{field}");
            }
            assert!(prompt.contains("\"required\""));
        }
    }

    #[test]
    fn test_default_language_is_chinese() {
        let prompt = PromptBuilder::default().build_prompt(CritiqueStyle::Social);
        assert!(prompt.contains("世界级的摄影评论家"));
        assert!(prompt.contains("简体中文"));
    }

    #[test]
    fn test_english_prompt_lists_dimensions() {
        let prompt = PromptBuilder::new(Language::English).build_prompt(CritiqueStyle::Technical);
        assert!(prompt.contains("Scores from 0-100"));
        assert!(prompt.contains("Be strict with scoring."));
    }
}
