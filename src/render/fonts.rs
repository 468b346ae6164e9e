//! Font registry: font files loaded once, looked up by family name.
//!
//! The registry is immutable after [`FontRegistryBuilder::build`] and is
//! shared by reference between concurrent renders.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ttf_parser::{name_id, Face};

const FONT_EXTENSIONS: [&str; 4] = ["ttf", "otf", "ttc", "otc"];
const CJK_HINTS: [&str; 5] = ["cjk", "chinese", "simsun", "yahei", "pingfang"];

/// One face inside a font file.
#[derive(Clone)]
pub struct FontFace {
    /// Family name from the `name` table, or the file stem if it has none.
    pub family: String,
    pub file_name: String,
    data: Arc<Vec<u8>>,
    index: u32,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("family", &self.family)
            .field("file_name", &self.file_name)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

fn family_name(face: &Face<'_>) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|n| n.name_id == name_id::TYPOGRAPHIC_FAMILY || n.name_id == name_id::FAMILY)
        .find_map(|n| n.to_string())
        .filter(|s| !s.trim().is_empty())
}

fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
        .to_string()
}

/// Whether a font file name hints at CJK coverage.
pub fn suggests_cjk(file_name: &str) -> bool {
    let stem = file_stem(file_name).to_ascii_lowercase();
    CJK_HINTS.iter().any(|hint| stem.contains(hint))
        || stem.ends_with("sc")
        || ["sc-", "sc_", "sc "].iter().any(|p| stem.contains(p))
}

impl FontFace {
    fn parse(file_name: &str, data: &Arc<Vec<u8>>, index: u32) -> Option<Self> {
        let face = Face::parse(data, index).ok()?;
        let family = family_name(&face).unwrap_or_else(|| file_stem(file_name));
        Some(Self {
            family,
            file_name: file_name.to_string(),
            data: Arc::clone(data),
            index,
        })
    }

    /// Parsed view of the face. Cheap; nothing is copied.
    pub fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.index).ok()
    }

    fn matches(&self, family: &str) -> bool {
        self.family.eq_ignore_ascii_case(family)
            || file_stem(&self.file_name).eq_ignore_ascii_case(family)
    }
}

/// Loaded font faces plus the designated default face.
#[derive(Debug, Clone, Default)]
pub struct FontRegistry {
    faces: Vec<FontFace>,
    default: Option<usize>,
}

impl FontRegistry {
    pub fn builder() -> FontRegistryBuilder {
        FontRegistryBuilder::default()
    }

    /// A registry with no faces. Rendering with it skips text.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every font found in the platform's usual font directories.
    pub fn system() -> Self {
        Self::builder().add_system_dirs().build()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn faces(&self) -> &[FontFace] {
        &self.faces
    }

    pub fn default_face(&self) -> Option<&FontFace> {
        self.default.and_then(|i| self.faces.get(i))
    }

    /// Face for `family` (case-insensitive, by family or file name),
    /// falling back to the default face.
    pub fn resolve(&self, family: &str) -> Option<&FontFace> {
        let family = family.trim();
        self.faces
            .iter()
            .find(|f| f.matches(family))
            .or_else(|| self.default_face())
    }
}

/// Collects font data before freezing it into a [`FontRegistry`].
#[derive(Debug, Default)]
pub struct FontRegistryBuilder {
    faces: Vec<FontFace>,
}

impl FontRegistryBuilder {
    /// Add every face in a font file or collection held in memory.
    #[must_use]
    pub fn add_bytes(mut self, file_name: &str, data: Vec<u8>) -> Self {
        let data = Arc::new(data);
        let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
        let before = self.faces.len();
        for index in 0..count {
            if let Some(face) = FontFace::parse(file_name, &data, index) {
                self.faces.push(face);
            }
        }
        if self.faces.len() == before {
            log::warn!("font {file_name}: no usable faces");
        }
        self
    }

    #[must_use]
    pub fn add_file(self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        match std::fs::read(path) {
            Ok(data) => self.add_bytes(&name, data),
            Err(e) => {
                log::warn!("font {}: {e}", path.display());
                self
            }
        }
    }

    /// Add all font files below `dir`, recursing into subdirectories in
    /// sorted order. Missing directories are ignored.
    #[must_use]
    pub fn add_dir(self, dir: impl AsRef<Path>) -> Self {
        let mut files = Vec::new();
        collect_font_files(dir.as_ref(), &mut files);
        files.sort();
        files.into_iter().fold(self, Self::add_file)
    }

    /// Add the platform font directories plus any listed in
    /// `XLSNAP_FONT_DIR`.
    #[must_use]
    pub fn add_system_dirs(self) -> Self {
        system_font_dirs().into_iter().fold(self, Self::add_dir)
    }

    pub fn build(self) -> FontRegistry {
        let default = self
            .faces
            .iter()
            .position(|f| suggests_cjk(&f.file_name))
            .or_else(|| (!self.faces.is_empty()).then_some(0));
        if let Some(face) = default.and_then(|i| self.faces.get(i)) {
            log::debug!(
                "font registry: {} faces, default {:?} ({})",
                self.faces.len(),
                face.family,
                face.file_name
            );
        }
        FontRegistry {
            faces: self.faces,
            default,
        }
    }
}

fn collect_font_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_font_files(&path, out);
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        {
            out.push(path);
        }
    }
}

fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    #[cfg(target_os = "windows")]
    {
        dirs.push(PathBuf::from(r"C:\Windows\Fonts"));
    }

    #[cfg(target_os = "linux")]
    {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join(".fonts"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }

    if let Ok(extra) = std::env::var("XLSNAP_FONT_DIR") {
        dirs.extend(std::env::split_paths(&extra).filter(|p| !p.as_os_str().is_empty()));
    }
    dirs
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::render::text::FaceSet;
    use crate::style::FontSpec;
    use test_case::test_case;

    #[test_case("NotoSansCJKsc-Regular.otf", true)]
    #[test_case("NotoSansSC-Regular.ttf", true)]
    #[test_case("msyh-yahei.ttc", true)]
    #[test_case("simsun.ttc", true)]
    #[test_case("PingFang.ttc", true)]
    #[test_case("DejaVuSansCondensed.ttf", false)]
    #[test_case("Arial.ttf", false)]
    fn test_suggests_cjk(name: &str, expected: bool) {
        assert_eq!(suggests_cjk(name), expected);
    }

    #[test]
    fn test_empty_registry() {
        let registry = FontRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.default_face().is_none());
        assert!(registry.resolve("Calibri").is_none());
    }

    #[test]
    fn test_garbage_bytes_are_skipped() {
        let registry = FontRegistry::builder()
            .add_bytes("broken.ttf", b"not a font".to_vec())
            .add_file("/definitely/missing/font.ttf")
            .add_dir("/definitely/missing/dir")
            .build();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unparsable_registered_face_skips_text() {
        let broken = FontFace {
            family: "Calibri".to_string(),
            file_name: "calibri.ttf".to_string(),
            data: Arc::new(b"truncated".to_vec()),
            index: 0,
        };
        let registry = FontRegistry {
            faces: vec![broken],
            default: Some(0),
        };
        assert!(!registry.is_empty());
        assert!(registry.resolve("Calibri").is_some());
        assert!(FaceSet::for_font(&registry, &FontSpec::default()).is_none());
    }

    #[test]
    fn test_add_dir_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join("bad.ttf"), b"junk").unwrap();
        let mut files = Vec::new();
        collect_font_files(dir.path(), &mut files);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("bad.ttf"));
    }
}
