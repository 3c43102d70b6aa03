use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StylePreset {
    pub key: &'static str,
    pub descriptor: &'static str,
}

pub const STYLE_PRESETS: &[StylePreset] = &[
    StylePreset {
        key: "figurative-ink",
        descriptor: "expressive ink figure drawing, confident contour lines, sumi wash shadows, white paper",
    },
    StylePreset {
        key: "charcoal-gesture",
        descriptor: "loose charcoal gesture sketch, dynamic pose, smudged tonal masses, toned paper",
    },
    StylePreset {
        key: "graphite-academic",
        descriptor: "academic graphite life drawing, careful anatomy, cross-hatching, soft studio light",
    },
    StylePreset {
        key: "watercolor-study",
        descriptor: "watercolor figure study, wet-on-wet washes, granulating pigment, bleeding edges",
    },
    StylePreset {
        key: "oil-portrait",
        descriptor: "classical oil painting, chiaroscuro lighting, visible brushwork, warm earth palette",
    },
];

static PRESETS_BY_KEY: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    STYLE_PRESETS
        .iter()
        .map(|preset| (preset.key, preset.descriptor))
        .collect()
});

pub fn descriptor(key: &str) -> Option<&'static str> {
    PRESETS_BY_KEY.get(key).copied()
}

/// Appends the preset's descriptor to the prompt. Unknown keys leave the
/// prompt untouched.
pub fn apply(prompt: &str, style: Option<&str>) -> String {
    match style.and_then(descriptor) {
        Some(descriptor) => format!("{prompt}, {descriptor}"),
        None => prompt.to_string(),
    }
}
