/// Frame-name grouping into animation ranges
pub mod animation;
/// Length-prefixed chunk format decoder (`.3ds`)
pub mod chunked;
/// Fixed-layout keyframe format decoder (`.md2`)
pub mod keyframe;
/// Model, object, face and material types
pub mod mesh;
/// Texture filename registry
pub mod texture;

use std::path::Path;

use rootcause::Report;
use thiserror::Error;
use tracing::debug;

use crate::data::FileData;
use crate::data::reader::ReadError;
use crate::error::{Error, ErrorKind, failure_from_kind};
use crate::models::chunked::{CHUNKED_SIGNATURE, ChunkDecodeOptions, decode_chunked};
use crate::models::keyframe::{KEYFRAME_MAGIC, KeyframeDecodeOptions, decode_keyframe_model};
use crate::models::mesh::Model;
use crate::models::texture::TextureRegistry;

/// Non-fatal conditions met while decoding.
///
/// A decode that produced warnings still returns a model; whether that model
/// is good enough is up to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeWarning {
    #[error("root chunk 0x{found:04X} is not the expected signature 0x{expected:04X}")]
    SignatureMismatch { found: u16, expected: u16 },
    #[error("skipped chunk 0x{id:04X} ({length} bytes) at offset 0x{offset:X}")]
    UnknownChunkSkipped { id: u16, offset: usize, length: u32 },
    #[error("chunk 0x{id:04X} at offset 0x{offset:X} declares {declared} bytes, spans {consumed}")]
    LengthMismatch {
        id: u16,
        offset: usize,
        declared: u32,
        consumed: usize,
    },
    #[error("file version {version} is newer than {max}, the model may load incorrectly")]
    NewerVersion { version: u32, max: u32 },
    #[error("unexpected keyframe magic 0x{found:08X}")]
    BadMagic { found: u32 },
    #[error("input ended early, model is partial: {0}")]
    Truncated(ReadError),
}

impl DecodeWarning {
    /// Skipped chunks are a normal part of reading the format and say nothing
    /// about the quality of the result.
    pub fn is_informational(&self) -> bool {
        matches!(self, DecodeWarning::UnknownChunkSkipped { .. })
    }
}

/// A decoded value and everything that went wrong on the way to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub value: T,
    pub warnings: Vec<DecodeWarning>,
    /// Bytes of the input the decoder consumed.
    pub bytes_read: usize,
}

impl<T> Decoded<T> {
    /// True when the only warnings are informational.
    pub fn is_clean(&self) -> bool {
        self.warnings.iter().all(DecodeWarning::is_informational)
    }

    /// True when decoding stopped before the input said it should.
    pub fn is_partial(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, DecodeWarning::Truncated(_)))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Decoded<U> {
        Decoded {
            value: f(self.value),
            warnings: self.warnings,
            bytes_read: self.bytes_read,
        }
    }
}

/// The model file formats this crate can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModelFormat {
    Chunked,
    Keyframe,
}

impl ModelFormat {
    /// Sniff the format from the first bytes of a file.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if let Some(magic) = data.first_chunk::<4>() {
            if u32::from_le_bytes(*magic) == KEYFRAME_MAGIC {
                return Some(ModelFormat::Keyframe);
            }
        }
        let signature = data.first_chunk::<2>()?;
        (u16::from_le_bytes(*signature) == CHUNKED_SIGNATURE).then_some(ModelFormat::Chunked)
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        if extension.eq_ignore_ascii_case("3ds") {
            Some(ModelFormat::Chunked)
        } else if extension.eq_ignore_ascii_case("md2") {
            Some(ModelFormat::Keyframe)
        } else {
            None
        }
    }
}

/// Options for [`load_model`], one set per format.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub chunked: ChunkDecodeOptions,
    pub keyframe: KeyframeDecodeOptions,
}

/// A model loaded from disk, with the format it was decoded as.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub format: ModelFormat,
    pub model: Decoded<Model>,
}

/// Read a model file, picking the decoder from the file contents and falling
/// back to its extension.
///
/// Texture filenames referenced by the model are added to `textures`.
pub fn load_model<P: AsRef<Path>>(
    path: P,
    options: &LoadOptions,
    textures: &mut TextureRegistry,
) -> Result<LoadedModel, Report<Error>> {
    let path = path.as_ref();
    let data = FileData::open(path).map_err(|err| Report::new(Error::from(err)))?;

    let format = ModelFormat::detect(&data)
        .or_else(|| ModelFormat::from_extension(path))
        .ok_or_else(|| {
            Report::new(failure_from_kind(ErrorKind::UnknownFormat {
                path: path.display().to_string(),
            }))
        })?;
    debug!(path = %path.display(), ?format, bytes = data.len(), "loading model");

    let model = match format {
        ModelFormat::Chunked => decode_chunked(&data, &options.chunked, textures).map_err(|err| {
            Report::new(failure_from_kind(ErrorKind::ChunkDecode {
                detail: err.to_string(),
            }))
        })?,
        ModelFormat::Keyframe => decode_keyframe_model(&data, &options.keyframe, textures)
            .map_err(|err| {
                Report::new(failure_from_kind(ErrorKind::KeyframeDecode {
                    detail: err.to_string(),
                }))
            })?,
    };

    Ok(LoadedModel { format, model })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_format_from_magic() {
        assert_eq!(
            ModelFormat::detect(b"IDP2\x08\0\0\0"),
            Some(ModelFormat::Keyframe)
        );
        assert_eq!(
            ModelFormat::detect(&[0x4D, 0x4D, 6, 0, 0, 0]),
            Some(ModelFormat::Chunked)
        );
        assert_eq!(ModelFormat::detect(b"MZ"), None);
        assert_eq!(ModelFormat::detect(b""), None);
    }

    #[test]
    fn detects_format_from_extension() {
        assert_eq!(
            ModelFormat::from_extension(Path::new("models/Crate.3DS")),
            Some(ModelFormat::Chunked)
        );
        assert_eq!(
            ModelFormat::from_extension(Path::new("tris.md2")),
            Some(ModelFormat::Keyframe)
        );
        assert_eq!(ModelFormat::from_extension(Path::new("scene.obj")), None);
    }

    #[test]
    fn informational_warnings_keep_decode_clean() {
        let decoded = Decoded {
            value: (),
            warnings: vec![DecodeWarning::UnknownChunkSkipped {
                id: 0x7012,
                offset: 0x20,
                length: 12,
            }],
            bytes_read: 0,
        };
        assert!(decoded.is_clean());
        assert!(!decoded.is_partial());

        let truncated = decoded.map(|_| 1u8);
        assert_eq!(truncated.value, 1);
    }

    #[test]
    fn loading_a_missing_file_fails_with_io_error() {
        let mut textures = TextureRegistry::new();
        let err = load_model(
            "/definitely/not/here.3ds",
            &LoadOptions::default(),
            &mut textures,
        )
        .unwrap_err();
        assert!(matches!(err.current_context().kind, ErrorKind::IoError(_)));
    }
}
