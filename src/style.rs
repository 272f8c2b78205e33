use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct StylePreset {
    pub id: &'static str,
    pub name: &'static str,
    pub modifier: &'static str,
}

pub const DEFAULT_PRESET: &str = "default";

const PRESETS: &[StylePreset] = &[
    StylePreset { id: DEFAULT_PRESET, name: "Default", modifier: "" },
    StylePreset { id: "cinematic", name: "Cinematic", modifier: "cinematic film still, dramatic lighting, shallow depth of field, 35mm film" },
    StylePreset { id: "anime", name: "Anime", modifier: "anime style, vibrant colors, 2D illustration, studio ghibli inspired" },
    StylePreset { id: "abstract", name: "Abstract", modifier: "abstract art, expressionist style, vibrant colors, creative composition" },
    StylePreset { id: "photorealistic", name: "Photorealistic", modifier: "highly detailed, photorealistic, professional photography, 8k, high resolution" },
    StylePreset { id: "watercolor", name: "Watercolor", modifier: "watercolor painting, artistic, traditional media, soft edges, flowing colors" },
    StylePreset { id: "digital", name: "Digital Art", modifier: "digital art, crisp details, vivid colors, modern design, highly detailed" },
    StylePreset { id: "vintage", name: "Vintage", modifier: "vintage photograph, retro, nostalgic, film grain, desaturated colors" },
];

/// Prompt suffix for a preset. Unknown ids behave exactly like `default`.
pub fn style_modifier(preset_id: &str) -> &'static str {
    PRESETS
        .iter()
        .find(|p| p.id == preset_id)
        .map(|p| p.modifier)
        .unwrap_or("")
}

pub fn presets() -> &'static [StylePreset] {
    PRESETS
}

pub fn apply_style(prompt: &str, preset_id: &str) -> String {
    match style_modifier(preset_id) {
        "" => prompt.to_string(),
        modifier => format!("{prompt}, {modifier}"),
    }
}
