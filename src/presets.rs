//! Compiled-in catalog of well-known OpenAI-compatible SaaS endpoints.
//!
//! Grounded on `core/presets.py` in the original source: six entries, all
//! `provider_type = "openai"`, used both to auto-fill `provider_type`/`base_url`
//! on Provider creation and to supply a safe `test_model` for the connectivity
//! prober when `GET /models` is unsupported.

#[derive(Debug, Clone, Copy)]
pub struct ProviderPreset {
    pub preset_id: &'static str,
    pub display_name: &'static str,
    pub provider_type: &'static str,
    pub base_url: &'static str,
    pub test_model_id: &'static str,
}

pub const BUILTIN_PRESETS: &[ProviderPreset] = &[
    ProviderPreset {
        preset_id: "openrouter",
        display_name: "OpenRouter",
        provider_type: "openai",
        base_url: "https://openrouter.ai/api/v1",
        test_model_id: "openrouter/auto",
    },
    ProviderPreset {
        preset_id: "kimi",
        display_name: "Kimi",
        provider_type: "openai",
        base_url: "https://api.moonshot.cn/v1",
        test_model_id: "moonshot-v1-8k",
    },
    ProviderPreset {
        preset_id: "zhipu",
        display_name: "智谱 AI",
        provider_type: "openai",
        base_url: "https://open.bigmodel.cn/api/paas/v4",
        test_model_id: "glm-4-flash-250414",
    },
    ProviderPreset {
        preset_id: "aiping",
        display_name: "AIPing",
        provider_type: "openai",
        base_url: "https://aiping.cn/api/v1",
        test_model_id: "DeepSeek-V3.2",
    },
    ProviderPreset {
        preset_id: "minimax",
        display_name: "MiniMax",
        provider_type: "openai",
        base_url: "https://api.minimaxi.com/v1",
        test_model_id: "MiniMax-M2.5",
    },
    ProviderPreset {
        preset_id: "siliconflow",
        display_name: "硅基流动",
        provider_type: "openai",
        base_url: "https://api.siliconflow.cn/v1",
        test_model_id: "Qwen/Qwen2.5-7B-Instruct",
    },
];

pub fn get_preset(preset_id: &str) -> Option<&'static ProviderPreset> {
    BUILTIN_PRESETS.iter().find(|p| p.preset_id == preset_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_known_preset() {
        let preset = get_preset("kimi").expect("kimi preset exists");
        assert_eq!(preset.base_url, "https://api.moonshot.cn/v1");
    }

    #[test]
    fn unknown_preset_is_none() {
        assert!(get_preset("does-not-exist").is_none());
    }

    #[test]
    fn every_builtin_preset_is_openai_dialect() {
        assert!(BUILTIN_PRESETS.iter().all(|p| p.provider_type == "openai"));
    }
}
