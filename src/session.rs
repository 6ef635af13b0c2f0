use crate::media::EncodedImage;
use crate::styles::default_style;

/// Which image slot a capture or clear action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Face,
    Reference,
}

impl ImageSlot {
    pub fn label(self) -> &'static str {
        match self {
            ImageSlot::Face => "face photo",
            ImageSlot::Reference => "reference photo",
        }
    }
}

/// User inputs for the next generation. Every setter replaces its field wholesale;
/// the style id is stored as given and only resolved when a request is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    face_image: Option<EncodedImage>,
    reference_image: Option<EncodedImage>,
    custom_text: String,
    selected_style_id: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            face_image: None,
            reference_image: None,
            custom_text: String::new(),
            selected_style_id: default_style().id.to_string(),
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn face_image(&self) -> Option<&EncodedImage> {
        self.face_image.as_ref()
    }

    pub fn reference_image(&self) -> Option<&EncodedImage> {
        self.reference_image.as_ref()
    }

    pub fn image(&self, slot: ImageSlot) -> Option<&EncodedImage> {
        match slot {
            ImageSlot::Face => self.face_image(),
            ImageSlot::Reference => self.reference_image(),
        }
    }

    pub fn custom_text(&self) -> &str {
        &self.custom_text
    }

    pub fn selected_style_id(&self) -> &str {
        &self.selected_style_id
    }

    pub fn set_face_image(&mut self, image: EncodedImage) {
        self.face_image = Some(image);
    }

    pub fn set_reference_image(&mut self, image: EncodedImage) {
        self.reference_image = Some(image);
    }

    pub fn set_image(&mut self, slot: ImageSlot, image: EncodedImage) {
        match slot {
            ImageSlot::Face => self.set_face_image(image),
            ImageSlot::Reference => self.set_reference_image(image),
        }
    }

    /// Empties the slot. Returns whether an image was actually removed; clearing an
    /// already empty slot changes nothing.
    pub fn clear_image(&mut self, slot: ImageSlot) -> bool {
        let removed = match slot {
            ImageSlot::Face => self.face_image.take(),
            ImageSlot::Reference => self.reference_image.take(),
        };
        removed.is_some()
    }

    pub fn set_custom_text(&mut self, text: impl Into<String>) {
        self.custom_text = text.into();
    }

    pub fn set_selected_style_id(&mut self, id: impl Into<String>) {
        self.selected_style_id = id.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::fixtures;

    #[test]
    fn defaults_to_first_catalog_style() {
        let state = SessionState::new();
        assert_eq!(state.selected_style_id(), "business");
        assert!(state.face_image().is_none());
        assert!(state.reference_image().is_none());
        assert_eq!(state.custom_text(), "");
    }

    #[test]
    fn setters_replace_whole_values() {
        let mut state = SessionState::new();
        state.set_face_image(fixtures::png(2, 2, 1));
        state.set_face_image(fixtures::png(3, 3, 2));
        assert_eq!(state.face_image().and_then(|image| image.dimensions()), Some((3, 3)));

        state.set_custom_text("curly hair");
        state.set_custom_text("glasses");
        assert_eq!(state.custom_text(), "glasses");
    }

    #[test]
    fn style_id_is_not_validated_on_set() {
        let mut state = SessionState::new();
        state.set_selected_style_id("does-not-exist");
        assert_eq!(state.selected_style_id(), "does-not-exist");
    }

    #[test]
    fn clearing_an_empty_slot_is_a_no_op() {
        let mut state = SessionState::new();
        state.set_custom_text("keep me");
        state.set_reference_image(fixtures::png(2, 2, 9));
        let before = state.clone();

        assert!(!state.clear_image(ImageSlot::Face));
        assert!(!state.clear_image(ImageSlot::Face));
        assert_eq!(state, before);
    }

    #[test]
    fn clearing_a_filled_slot_only_touches_that_slot() {
        let mut state = SessionState::new();
        state.set_face_image(fixtures::png(2, 2, 1));
        state.set_reference_image(fixtures::png(2, 2, 2));

        assert!(state.clear_image(ImageSlot::Reference));
        assert!(state.reference_image().is_none());
        assert!(state.face_image().is_some());
    }
}
