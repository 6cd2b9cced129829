//! Caller-owned registry of texture files referenced by decoded materials.
//!
//! Decoding never loads pixel data. It only records which texture files a
//! model needs and hands back a stable [`TextureHandle`] for each, so the
//! renderer can resolve handles to GPU textures later. One registry can be
//! shared across every model loaded in a session.

use std::collections::HashMap;

/// Index of a texture file within a [`TextureRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextureHandle(pub u32);

/// Texture filenames in first-registration order.
///
/// Lookup is ASCII case-insensitive: `Crate.TGA` and `crate.tga` resolve to
/// the same handle, and the spelling seen first is the one kept.
#[derive(Debug, Default, Clone)]
pub struct TextureRegistry {
    filenames: Vec<String>,
    by_name: HashMap<String, TextureHandle>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `filename`, registering it if it is new.
    pub fn register(&mut self, filename: &str) -> TextureHandle {
        let key = filename.to_ascii_lowercase();
        if let Some(handle) = self.by_name.get(&key) {
            return *handle;
        }

        let handle = TextureHandle(self.filenames.len() as u32);
        self.filenames.push(filename.to_string());
        self.by_name.insert(key, handle);
        handle
    }

    pub fn get(&self, filename: &str) -> Option<TextureHandle> {
        self.by_name.get(&filename.to_ascii_lowercase()).copied()
    }

    pub fn filename(&self, handle: TextureHandle) -> Option<&str> {
        self.filenames.get(handle.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    /// All registered textures in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (TextureHandle, &str)> {
        self.filenames
            .iter()
            .enumerate()
            .map(|(i, name)| (TextureHandle(i as u32), name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_case_insensitive_and_ordered() {
        let mut registry = TextureRegistry::new();
        let crate_tex = registry.register("Crate.TGA");
        let floor = registry.register("floor.tga");
        assert_eq!(registry.register("crate.tga"), crate_tex);
        assert_eq!(crate_tex, TextureHandle(0));
        assert_eq!(floor, TextureHandle(1));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.filename(crate_tex), Some("Crate.TGA"));
        assert_eq!(registry.get("FLOOR.tga"), Some(floor));
        assert_eq!(registry.get("wall.tga"), None);

        let names: Vec<_> = registry.iter().map(|(_, name)| name).collect();
        assert_eq!(names, ["Crate.TGA", "floor.tga"]);
    }
}
