#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleDefinition {
    pub id: &'static str,
    pub display_name: &'static str,
    pub short_description: &'static str,
    pub preview_image_ref: &'static str,
    pub generation_instruction: &'static str,
}

/// The portrait styles offered to the user, in display order. The first entry is the
/// default selection and the fallback for unknown ids.
pub static STYLE_CATALOG: [StyleDefinition; 5] = [
    StyleDefinition {
        id: "business",
        display_name: "商务精英",
        short_description: "专业职场形象，正装出席",
        preview_image_ref: "https://images.unsplash.com/photo-1560250097-0b93528c311a?q=80&w=800&auto=format&fit=crop",
        generation_instruction: "Professional corporate headshot, young Asian woman wearing a sleek charcoal gray business blazer and white silk blouse, minimalist modern office background, soft high-key lighting, sharp focus on eyes, 8k resolution, photorealistic.",
    },
    StyleDefinition {
        id: "artistic",
        display_name: "文艺胶片",
        short_description: "复古胶片质感，充满故事感",
        preview_image_ref: "https://images.unsplash.com/photo-1529626455594-4ff0802cfb7e?q=80&w=800&auto=format&fit=crop",
        generation_instruction: "Artistic outdoor portrait, young Asian woman in a soft cream-colored vintage blouse, long wavy hair, standing in a sun-drenched forest with beautiful bokeh, 35mm film photography style, warm golden hour lighting, cinematic aesthetic.",
    },
    StyleDefinition {
        id: "cyberpunk",
        display_name: "赛博未来",
        short_description: "霓虹灯效，前卫未来感",
        preview_image_ref: "https://images.unsplash.com/photo-1605810230434-7631ac76ec81?q=80&w=800&auto=format&fit=crop",
        generation_instruction: "Cyberpunk style portrait, neon-lit rainy street background, vibrant blue and magenta lighting, futuristic tech-wear jacket with glowing accents, subtle tech implants on face, cinematic lighting, sharp details, hyper-realistic, high contrast.",
    },
    StyleDefinition {
        id: "minimalist",
        display_name: "纯净简约",
        short_description: "纯色背景，干净利落",
        preview_image_ref: "https://images.unsplash.com/photo-1534528741775-53994a69daeb?q=80&w=800&auto=format&fit=crop",
        generation_instruction: "Minimalist studio portrait, clean solid light gray background, Asian woman wearing a simple high-quality white sleeveless top, natural long wavy hair, soft diffused studio lighting, natural skin texture, serene expression.",
    },
    StyleDefinition {
        id: "vogue",
        display_name: "潮流杂志",
        short_description: "高端杂志封面质感",
        preview_image_ref: "https://images.unsplash.com/photo-1531123897727-8f129e1688ce?q=80&w=800&auto=format&fit=crop",
        generation_instruction: "Vogue magazine cover style, high fashion photography, dramatic side profile, luxurious emerald green velvet dress with intricate embroidery, high-end jewelry, geometric reflective background, sharp dramatic lighting, \"VOGUE LUXE\" typography overlay style.",
    },
];

pub fn default_style() -> &'static StyleDefinition {
    &STYLE_CATALOG[0]
}

/// Exact, case-sensitive id match.
pub fn find_style(id: &str) -> Option<&'static StyleDefinition> {
    STYLE_CATALOG.iter().find(|style| style.id == id)
}

/// Unknown ids resolve to the default style rather than failing.
pub fn resolve_style(id: &str) -> &'static StyleDefinition {
    find_style(id).unwrap_or_else(default_style)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let ids: HashSet<_> = STYLE_CATALOG.iter().map(|style| style.id).collect();
        assert_eq!(ids.len(), STYLE_CATALOG.len());
    }

    #[test]
    fn resolves_known_ids() {
        assert_eq!(resolve_style("cyberpunk").display_name, "赛博未来");
        assert_eq!(resolve_style("vogue").id, "vogue");
    }

    #[test]
    fn padded_ids_are_not_catalog_entries() {
        assert!(find_style(" vogue ").is_none());
        assert!(find_style("vogue\n").is_none());
        assert_eq!(resolve_style(" vogue ").id, "business");
    }

    #[test]
    fn unknown_ids_fall_back_to_first_entry() {
        for id in ["", "BUSINESS", "watercolor", "cyber punk"] {
            assert_eq!(resolve_style(id).id, "business", "id {id:?}");
        }
    }
}
