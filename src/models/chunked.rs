//! Decoder for the length-prefixed chunk format (3D Studio `.3ds`).
//!
//! A file is a tree of chunks. Each chunk starts with a 6-byte header (u16 id,
//! u32 length) where the length covers the header, the chunk's own payload and
//! all of its children. The decoder walks the tree recursively: every handler
//! reports how many body bytes it consumed, and the caller skips whatever is
//! left so that each chunk, known or not, advances the stream by exactly its
//! declared length.
//!
//! ```text
//! Main (0x4D4D)
//! +-- Version (0x0002)
//! +-- MeshRoot (0x3D3D)
//! |   +-- MeshVersion (0x3D3E)
//! |   +-- MaterialRoot (0xAFFF)
//! |   |   +-- MaterialName (0xA000)
//! |   |   +-- MaterialDiffuse (0xA020) -> Color24 (0x0011) / ColorF32 (0x0010)
//! |   |   +-- MaterialMap (0xA200)
//! |   |       +-- MaterialMapFile (0xA300)
//! |   +-- Object (0x4000)
//! |       +-- ObjectMesh (0x4100)
//! |           +-- Vertices (0x4110)
//! |           +-- Faces (0x4120)
//! |           |   +-- FaceMaterial (0x4130)
//! |           +-- TexCoords (0x4140)
//! +-- Keyframes (0xB000)
//! ```

use std::fmt;

use bon::Builder;
use glam::{Vec2, Vec3};
use rootcause::Report;
use thiserror::Error;
use tracing::{debug, trace, warn};
use winnow::Parser;
use winnow::binary::{le_f32, le_u16};
use winnow::combinator::repeat;

use crate::data::parser_utils::WResult;
use crate::data::reader::{LeReader, ReadError};
use crate::models::mesh::{Face, Material, Model, Object, z_up_to_y_up};
use crate::models::texture::TextureRegistry;
use crate::models::{DecodeWarning, Decoded};
use crate::recognized::Recognized;

/// Id of the root chunk of every well-formed file.
pub const CHUNKED_SIGNATURE: u16 = 0x4D4D;
/// Size of the id + length header in front of every chunk.
pub const CHUNK_HEADER_SIZE: usize = 6;

/// Chunk ids the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum ChunkId {
    Main = 0x4D4D,
    Version = 0x0002,
    ColorF32 = 0x0010,
    Color24 = 0x0011,
    MeshRoot = 0x3D3D,
    MeshVersion = 0x3D3E,
    Object = 0x4000,
    ObjectMesh = 0x4100,
    Vertices = 0x4110,
    Faces = 0x4120,
    FaceMaterial = 0x4130,
    TexCoords = 0x4140,
    MaterialName = 0xA000,
    MaterialAmbient = 0xA010,
    MaterialDiffuse = 0xA020,
    MaterialSpecular = 0xA030,
    MaterialMap = 0xA200,
    MaterialMapFile = 0xA300,
    MaterialMapUScale = 0xA354,
    MaterialMapVScale = 0xA356,
    MaterialRoot = 0xAFFF,
    Keyframes = 0xB000,
}

impl ChunkId {
    pub fn from_raw(raw: u16) -> Recognized<ChunkId, u16> {
        let id = match raw {
            0x4D4D => ChunkId::Main,
            0x0002 => ChunkId::Version,
            0x0010 => ChunkId::ColorF32,
            0x0011 => ChunkId::Color24,
            0x3D3D => ChunkId::MeshRoot,
            0x3D3E => ChunkId::MeshVersion,
            0x4000 => ChunkId::Object,
            0x4100 => ChunkId::ObjectMesh,
            0x4110 => ChunkId::Vertices,
            0x4120 => ChunkId::Faces,
            0x4130 => ChunkId::FaceMaterial,
            0x4140 => ChunkId::TexCoords,
            0xA000 => ChunkId::MaterialName,
            0xA010 => ChunkId::MaterialAmbient,
            0xA020 => ChunkId::MaterialDiffuse,
            0xA030 => ChunkId::MaterialSpecular,
            0xA200 => ChunkId::MaterialMap,
            0xA300 => ChunkId::MaterialMapFile,
            0xA354 => ChunkId::MaterialMapUScale,
            0xA356 => ChunkId::MaterialMapVScale,
            0xAFFF => ChunkId::MaterialRoot,
            0xB000 => ChunkId::Keyframes,
            other => return Recognized::Unknown(other),
        };
        Recognized::Known(id)
    }

    pub fn raw(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}(0x{:04X})", self.raw())
    }
}

/// A chunk header as read from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: Recognized<ChunkId, u16>,
    /// Total length, header included.
    pub length: u32,
    /// Stream offset of the header.
    pub offset: usize,
}

impl ChunkHeader {
    pub fn raw_id(&self) -> u16 {
        self.id.fold(ChunkId::raw, |raw| raw)
    }

    /// Payload and children, header excluded.
    pub fn body_len(&self) -> usize {
        (self.length as usize).saturating_sub(CHUNK_HEADER_SIZE)
    }
}

/// Errors that abort a chunked decode.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("stream ended early: {0}")]
    Read(#[from] ReadError),
    #[error("not a chunked model: root chunk is 0x{found:04X}, expected 0x{expected:04X}")]
    SignatureMismatch { found: u16, expected: u16 },
}

/// Settings for [`decode_chunked`].
#[derive(Debug, Clone, Builder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkDecodeOptions {
    /// Fail on a bad root signature or a truncated stream instead of
    /// returning a partial model with warnings.
    #[builder(default = false)]
    pub strict: bool,
    /// Newest file version known to load correctly.
    #[builder(default = 3)]
    pub max_version: u32,
    /// Compute per-vertex normals once decoding finishes.
    #[builder(default = true)]
    pub compute_normals: bool,
}

impl Default for ChunkDecodeOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Which handler set applies to the children of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Children of the root and mesh-root chunks.
    Scene,
    Material(usize),
    Color(usize, ColorSlot),
    Object(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorSlot {
    Ambient,
    Diffuse,
    Specular,
}

fn vertex_record(input: &mut &[u8]) -> WResult<Vec3> {
    let x = le_f32.parse_next(input)?;
    let y = le_f32.parse_next(input)?;
    let z = le_f32.parse_next(input)?;
    Ok(z_up_to_y_up(x, y, z))
}

fn face_record(input: &mut &[u8]) -> WResult<[u32; 3]> {
    let a = le_u16.parse_next(input)?;
    let b = le_u16.parse_next(input)?;
    let c = le_u16.parse_next(input)?;
    // Editor visibility flags.
    let _flags = le_u16.parse_next(input)?;
    Ok([a.into(), b.into(), c.into()])
}

fn texcoord_record(input: &mut &[u8]) -> WResult<Vec2> {
    let u = le_f32.parse_next(input)?;
    let v = le_f32.parse_next(input)?;
    Ok(Vec2::new(u, v))
}

struct ChunkDecoder<'a, 'o> {
    reader: LeReader<'a>,
    options: &'o ChunkDecodeOptions,
    textures: &'o mut TextureRegistry,
    model: Model,
    warnings: Vec<DecodeWarning>,
}

impl<'a, 'o> ChunkDecoder<'a, 'o> {
    fn warn(&mut self, warning: DecodeWarning) {
        if warning.is_informational() {
            debug!("{warning}");
        } else {
            warn!("{warning}");
        }
        self.warnings.push(warning);
    }

    fn read_header(&mut self) -> Result<ChunkHeader, ReadError> {
        let offset = self.reader.position();
        let id = self.reader.read_u16()?;
        let length = self.reader.read_u32()?;
        Ok(ChunkHeader {
            id: ChunkId::from_raw(id),
            length,
            offset,
        })
    }

    /// Read and fully process one chunk. Returns the bytes it occupied in the
    /// stream, header included.
    fn decode_chunk(&mut self, scope: Scope) -> Result<usize, ReadError> {
        let header = self.read_header()?;
        self.finish_chunk(&header, scope)
    }

    /// Decode the body of a chunk whose header was already read, then skip
    /// whatever the handler left unread.
    ///
    /// The handler only sees the declared body. When it asks for more and the
    /// body itself lies inside the enclosing chunk, the chunk is abandoned with
    /// a warning and decoding carries on after it. In strict mode that is an
    /// error instead.
    fn finish_chunk(&mut self, header: &ChunkHeader, scope: Scope) -> Result<usize, ReadError> {
        trace!(id = %header.id, offset = header.offset, length = header.length, "enter chunk");
        if (header.length as usize) < CHUNK_HEADER_SIZE {
            self.warn(DecodeWarning::LengthMismatch {
                id: header.raw_id(),
                offset: header.offset,
                declared: header.length,
                consumed: CHUNK_HEADER_SIZE,
            });
            return Ok(CHUNK_HEADER_SIZE);
        }

        let body = header.body_len();
        let complete = body <= self.reader.remaining();
        let outer = self.reader.clone();
        match self.in_body(body, |d| d.decode_body(header, scope)) {
            Ok(used) => {
                if used < body {
                    trace!(id = %header.id, skipped = body - used, "skip chunk remainder");
                }
            }
            Err(ReadError::Truncated { offset, need, .. }) if complete && !self.options.strict => {
                self.warn(DecodeWarning::LengthMismatch {
                    id: header.raw_id(),
                    offset: header.offset,
                    declared: header.length,
                    consumed: offset + need - header.offset,
                });
                self.reader = outer;
                self.reader.skip(body)?;
            }
            Err(err) => return Err(err),
        }
        Ok(CHUNK_HEADER_SIZE + body)
    }

    /// Run `f` with the reader cut off after `body` bytes, then move past the
    /// whole body. On error the reader is left where the failing read stopped.
    fn in_body(
        &mut self,
        body: usize,
        f: impl FnOnce(&mut Self) -> Result<usize, ReadError>,
    ) -> Result<usize, ReadError> {
        let outer = self.reader.clone();
        let start = outer.position();
        self.reader = outer.limited(body);
        let used = f(self)?;
        let read = self.reader.position() - start;
        self.reader.skip(body - read)?;
        self.reader = outer;
        self.reader.skip(body)?;
        Ok(used)
    }

    /// Decode child chunks until `budget` bytes have been consumed.
    fn decode_children(&mut self, scope: Scope, budget: usize) -> Result<usize, ReadError> {
        let mut consumed = 0;
        while consumed < budget {
            consumed += self.decode_chunk(scope)?;
        }
        Ok(consumed)
    }

    /// Run `f` and report how many bytes it read.
    fn measured<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ReadError>,
    ) -> Result<(T, usize), ReadError> {
        let start = self.reader.position();
        let value = f(self)?;
        Ok((value, self.reader.position() - start))
    }

    fn skip_unknown(&mut self, header: &ChunkHeader) -> Result<usize, ReadError> {
        self.warn(DecodeWarning::UnknownChunkSkipped {
            id: header.raw_id(),
            offset: header.offset,
            length: header.length,
        });
        Ok(0)
    }

    fn decode_body(&mut self, header: &ChunkHeader, scope: Scope) -> Result<usize, ReadError> {
        let body = header.body_len();
        let Recognized::Known(id) = header.id else {
            return self.skip_unknown(header);
        };

        match (scope, id) {
            (Scope::Scene, ChunkId::Version) => {
                let version = self.reader.read_u32()?;
                debug!(version, "file version");
                if version > self.options.max_version {
                    self.warn(DecodeWarning::NewerVersion {
                        version,
                        max: self.options.max_version,
                    });
                }
                Ok(4)
            }
            (Scope::Scene, ChunkId::MeshVersion) => {
                let version = self.reader.read_u32()?;
                debug!(version, "mesh version");
                Ok(4)
            }
            (Scope::Scene, ChunkId::MeshRoot) => self.decode_children(Scope::Scene, body),
            (Scope::Scene, ChunkId::Keyframes) => {
                debug!(offset = header.offset, length = header.length, "skipping keyframe data");
                Ok(0)
            }
            (Scope::Scene, ChunkId::MaterialRoot) => {
                self.model.materials.push(Material::default());
                let material = self.model.materials.len() - 1;
                self.decode_children(Scope::Material(material), body)
            }
            (Scope::Scene, ChunkId::Object) => {
                let (name, used) = self.measured(|d| d.reader.read_cstring())?;
                debug!(name = %name, "object");
                self.model.objects.push(Object::new(name));
                let object = self.model.objects.len() - 1;
                let rest = body.saturating_sub(used);
                let children = self.decode_children(Scope::Object(object), rest)?;
                Ok(used + children)
            }

            (Scope::Material(material), ChunkId::MaterialName) => {
                let (name, used) = self.measured(|d| d.reader.read_cstring())?;
                self.model.materials[material].name = name;
                Ok(used)
            }
            (Scope::Material(material), ChunkId::MaterialAmbient) => {
                self.decode_children(Scope::Color(material, ColorSlot::Ambient), body)
            }
            (Scope::Material(material), ChunkId::MaterialDiffuse) => {
                self.decode_children(Scope::Color(material, ColorSlot::Diffuse), body)
            }
            (Scope::Material(material), ChunkId::MaterialSpecular) => {
                self.decode_children(Scope::Color(material, ColorSlot::Specular), body)
            }
            (Scope::Material(_), ChunkId::MaterialMap) => self.decode_children(scope, body),
            (Scope::Material(material), ChunkId::MaterialMapFile) => {
                let (file, used) = self.measured(|d| d.reader.read_cstring())?;
                let handle = (!file.is_empty()).then(|| self.textures.register(&file));
                let material = &mut self.model.materials[material];
                material.texture_file = file;
                material.texture = handle;
                Ok(used)
            }
            (Scope::Material(material), ChunkId::MaterialMapUScale) => {
                self.model.materials[material].u_tile = self.reader.read_f32()?;
                Ok(4)
            }
            (Scope::Material(material), ChunkId::MaterialMapVScale) => {
                self.model.materials[material].v_tile = self.reader.read_f32()?;
                Ok(4)
            }

            (Scope::Color(material, slot), ChunkId::ColorF32) => {
                let color = Vec3::new(
                    self.reader.read_f32()?,
                    self.reader.read_f32()?,
                    self.reader.read_f32()?,
                );
                self.set_color(material, slot, color);
                Ok(12)
            }
            (Scope::Color(material, slot), ChunkId::Color24) => {
                let rgb = self.reader.read_bytes(3)?;
                let color = Vec3::new(rgb[0].into(), rgb[1].into(), rgb[2].into()) / 255.0;
                self.set_color(material, slot, color);
                Ok(3)
            }

            (Scope::Object(_), ChunkId::ObjectMesh) => self.decode_children(scope, body),
            (Scope::Object(object), ChunkId::Vertices) => self.read_vertices(object),
            (Scope::Object(object), ChunkId::Faces) => self.read_faces(object, body),
            (Scope::Object(object), ChunkId::FaceMaterial) => self.read_face_material(object, body),
            (Scope::Object(object), ChunkId::TexCoords) => self.read_texcoords(object),

            _ => self.skip_unknown(header),
        }
    }

    fn set_color(&mut self, material: usize, slot: ColorSlot, color: Vec3) {
        let material = &mut self.model.materials[material];
        match slot {
            ColorSlot::Ambient => material.ambient = color,
            ColorSlot::Diffuse => material.diffuse = color,
            ColorSlot::Specular => material.specular = color,
        }
    }

    fn read_vertices(&mut self, object: usize) -> Result<usize, ReadError> {
        let count = usize::from(self.reader.read_u16()?);
        let vertices: Vec<Vec3> = self
            .reader
            .parse(count * 12, |i| repeat(count, vertex_record).parse_next(i))?;
        self.model.objects[object].set_vertices(vertices);
        Ok(2 + count * 12)
    }

    /// Faces are followed, inside the same chunk, by optional sub-chunks that
    /// belong to the object (face material assignments).
    fn read_faces(&mut self, object: usize, body: usize) -> Result<usize, ReadError> {
        let count = usize::from(self.reader.read_u16()?);
        let faces: Vec<[u32; 3]> = self
            .reader
            .parse(count * 8, |i| repeat(count, face_record).parse_next(i))?;
        let target = &mut self.model.objects[object];
        target.faces.clear();
        target.faces.extend(faces.into_iter().map(Face::triangle));

        let used = 2 + count * 8;
        let rest = body.saturating_sub(used);
        if rest < CHUNK_HEADER_SIZE {
            return Ok(used);
        }
        Ok(used + self.decode_children(Scope::Object(object), rest)?)
    }

    /// Assign a material to the object by name.
    ///
    /// The name is followed by the list of faces it applies to; those faces
    /// get the material too.
    fn read_face_material(&mut self, object: usize, body: usize) -> Result<usize, ReadError> {
        let (name, mut used) = self.measured(|d| d.reader.read_cstring())?;
        let material = self.model.find_material(&name);
        let has_texture = material.is_some_and(|m| self.model.materials[m].has_texture());

        let target = &mut self.model.objects[object];
        target.material = material;
        match material {
            Some(_) => target.has_texture |= has_texture,
            None => debug!(object = %target.name, material = %name, "material not found"),
        }

        if body.saturating_sub(used) < 2 {
            return Ok(used);
        }
        let count = usize::from(self.reader.read_u16()?);
        used += 2;
        if body - used < count * 2 {
            return Ok(used);
        }
        let faces: Vec<u16> = self
            .reader
            .parse(count * 2, |i| repeat(count, le_u16).parse_next(i))?;
        used += count * 2;

        let target = &mut self.model.objects[object];
        for face in faces {
            if let Some(face) = target.faces.get_mut(usize::from(face)) {
                face.material = material;
            }
        }
        Ok(used)
    }

    fn read_texcoords(&mut self, object: usize) -> Result<usize, ReadError> {
        let count = usize::from(self.reader.read_u16()?);
        let texcoords: Vec<Vec2> = self
            .reader
            .parse(count * 8, |i| repeat(count, texcoord_record).parse_next(i))?;
        self.model.objects[object].texcoords = texcoords;
        Ok(2 + count * 8)
    }

    /// Decode from the root chunk. A stream error part way through leaves the
    /// model as far as it got.
    fn decode_root(&mut self) -> Result<(), ChunkError> {
        let header = self.read_header()?;
        if header.raw_id() != CHUNKED_SIGNATURE {
            let (found, expected) = (header.raw_id(), CHUNKED_SIGNATURE);
            if self.options.strict {
                return Err(ChunkError::SignatureMismatch { found, expected });
            }
            self.warn(DecodeWarning::SignatureMismatch { found, expected });
        }

        let body = header.body_len();
        self.in_body(body, |d| d.decode_children(Scope::Scene, body))?;
        Ok(())
    }
}

/// Decode a chunked model from `data`.
///
/// In the default lenient mode a truncated stream or an unexpected root id
/// produces warnings and whatever part of the model was decoded. With
/// [`ChunkDecodeOptions::strict`] both are errors instead.
pub fn decode_chunked(
    data: &[u8],
    options: &ChunkDecodeOptions,
    textures: &mut TextureRegistry,
) -> Result<Decoded<Model>, Report<ChunkError>> {
    let mut decoder = ChunkDecoder {
        reader: LeReader::new(data),
        options,
        textures,
        model: Model::default(),
        warnings: Vec::new(),
    };

    match decoder.decode_root() {
        Ok(()) => {}
        Err(ChunkError::Read(err)) if !options.strict => {
            decoder.warn(DecodeWarning::Truncated(err));
        }
        Err(err) => return Err(Report::new(err)),
    }

    let ChunkDecoder {
        reader,
        mut model,
        warnings,
        ..
    } = decoder;
    if options.compute_normals {
        for object in &mut model.objects {
            object.compute_normals();
        }
    }
    debug!(
        objects = model.objects.len(),
        materials = model.materials.len(),
        warnings = warnings.len(),
        "decoded chunked model"
    );

    Ok(Decoded {
        value: model,
        warnings,
        bytes_read: reader.position(),
    })
}
