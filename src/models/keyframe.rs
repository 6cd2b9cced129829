//! Decoder for the fixed-layout keyframe format (Quake II `.md2`).
//!
//! The file is a 68-byte header of seventeen i32 fields followed by tables at
//! the offsets the header declares: skin names, texture coordinates,
//! triangles and one block of quantized vertices per frame. Tables are read in
//! that order and the offsets must not go backwards.
//!
//! Unlike the chunked format there is no partial recovery: any error aborts
//! the decode of the file.

use bon::Builder;
use glam::{Vec2, Vec3};
use rootcause::Report;
use thiserror::Error;
use tracing::{debug, trace, warn};
use winnow::Parser;
use winnow::binary::{le_f32, le_i32, le_u8, le_u16, le_u32};
use winnow::combinator::repeat;

use crate::data::parser_utils::{WResult, padded_string};
use crate::data::reader::{LeReader, ReadError};
use crate::models::animation::extract_animation_ranges;
use crate::models::mesh::{Face, Material, Model, Object, z_up_to_y_up};
use crate::models::texture::TextureRegistry;
use crate::models::{DecodeWarning, Decoded};

/// `IDP2` read as a little-endian u32.
pub const KEYFRAME_MAGIC: u32 = 0x3250_4449;
/// The only version this decoder accepts.
pub const KEYFRAME_VERSION: i32 = 8;
/// Width of a skin filename field.
pub const SKIN_NAME_LEN: usize = 64;
/// Width of a frame name field.
pub const FRAME_NAME_LEN: usize = 16;
/// Size of one quantized vertex: three position bytes and a normal index.
pub const VERTEX_RECORD_SIZE: usize = 4;

const HEADER_SIZE: usize = 68;
const TEXCOORD_RECORD_SIZE: usize = 4;
const TRIANGLE_RECORD_SIZE: usize = 12;
/// Scale, translate and name in front of each frame's vertices.
const FRAME_HEADER_SIZE: usize = 24 + FRAME_NAME_LEN;

/// Errors that abort a keyframe decode.
#[derive(Debug, Error)]
pub enum KeyframeError {
    #[error("stream ended early: {0}")]
    Read(#[from] ReadError),
    #[error("unsupported keyframe version {found}, expected {expected}")]
    UnsupportedVersion { found: i32, expected: i32 },
    #[error("not a keyframe model: magic is 0x{found:08X}")]
    BadMagic { found: u32 },
    #[error("header field `{field}` has invalid value {value}")]
    InvalidHeader { field: &'static str, value: i32 },
    #[error("{table} table at offset {offset} starts before the current position {position}")]
    OffsetOutOfOrder {
        table: &'static str,
        offset: usize,
        position: usize,
    },
}

/// Settings for [`decode_keyframe_model`].
#[derive(Debug, Clone, Default, Builder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyframeDecodeOptions {
    /// Texture file to use as the model's only material.
    pub skin: Option<String>,
    /// Reject files whose magic is not `IDP2` instead of warning.
    #[builder(default)]
    pub check_magic: bool,
}

/// The fixed header, field for field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyframeHeader {
    pub magic: u32,
    pub version: i32,
    pub skin_width: i32,
    pub skin_height: i32,
    /// Bytes per frame, frame header included.
    pub frame_size: i32,
    pub num_skins: i32,
    pub num_vertices: i32,
    pub num_texcoords: i32,
    pub num_triangles: i32,
    pub num_gl_commands: i32,
    pub num_frames: i32,
    pub offset_skins: i32,
    pub offset_texcoords: i32,
    pub offset_triangles: i32,
    pub offset_frames: i32,
    pub offset_gl_commands: i32,
    pub offset_end: i32,
}

fn parse_header(input: &mut &[u8]) -> WResult<KeyframeHeader> {
    let magic = le_u32.parse_next(input)?;
    let version = le_i32.parse_next(input)?;
    let skin_width = le_i32.parse_next(input)?;
    let skin_height = le_i32.parse_next(input)?;
    let frame_size = le_i32.parse_next(input)?;
    let num_skins = le_i32.parse_next(input)?;
    let num_vertices = le_i32.parse_next(input)?;
    let num_texcoords = le_i32.parse_next(input)?;
    let num_triangles = le_i32.parse_next(input)?;
    let num_gl_commands = le_i32.parse_next(input)?;
    let num_frames = le_i32.parse_next(input)?;
    let offset_skins = le_i32.parse_next(input)?;
    let offset_texcoords = le_i32.parse_next(input)?;
    let offset_triangles = le_i32.parse_next(input)?;
    let offset_frames = le_i32.parse_next(input)?;
    let offset_gl_commands = le_i32.parse_next(input)?;
    let offset_end = le_i32.parse_next(input)?;
    Ok(KeyframeHeader {
        magic,
        version,
        skin_width,
        skin_height,
        frame_size,
        num_skins,
        num_vertices,
        num_texcoords,
        num_triangles,
        num_gl_commands,
        num_frames,
        offset_skins,
        offset_texcoords,
        offset_triangles,
        offset_frames,
        offset_gl_commands,
        offset_end,
    })
}

/// A triangle as vertex and texture coordinate indices, both 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyframeTriangle {
    pub vertices: [u16; 3],
    pub texcoords: [u16; 3],
}

fn parse_triangle(input: &mut &[u8]) -> WResult<KeyframeTriangle> {
    let v0 = le_u16.parse_next(input)?;
    let v1 = le_u16.parse_next(input)?;
    let v2 = le_u16.parse_next(input)?;
    let t0 = le_u16.parse_next(input)?;
    let t1 = le_u16.parse_next(input)?;
    let t2 = le_u16.parse_next(input)?;
    Ok(KeyframeTriangle {
        vertices: [v0, v1, v2],
        texcoords: [t0, t1, t2],
    })
}

fn parse_texcoord(input: &mut &[u8]) -> WResult<[u16; 2]> {
    let u = le_u16.parse_next(input)?;
    let v = le_u16.parse_next(input)?;
    Ok([u, v])
}

/// A quantized vertex position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyframeVertex {
    pub position: [u8; 3],
    /// Index into the format's fixed table of precomputed normals.
    pub normal_index: u8,
}

fn parse_vertex(input: &mut &[u8]) -> WResult<KeyframeVertex> {
    let x = le_u8.parse_next(input)?;
    let y = le_u8.parse_next(input)?;
    let z = le_u8.parse_next(input)?;
    let normal_index = le_u8.parse_next(input)?;
    Ok(KeyframeVertex {
        position: [x, y, z],
        normal_index,
    })
}

/// One animation frame: a full set of quantized vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeFrame {
    pub scale: Vec3,
    pub translate: Vec3,
    pub name: String,
    pub vertices: Vec<KeyframeVertex>,
}

struct FrameHeader {
    scale: Vec3,
    translate: Vec3,
    name: String,
}

fn parse_frame_header(input: &mut &[u8]) -> WResult<FrameHeader> {
    let sx = le_f32.parse_next(input)?;
    let sy = le_f32.parse_next(input)?;
    let sz = le_f32.parse_next(input)?;
    let tx = le_f32.parse_next(input)?;
    let ty = le_f32.parse_next(input)?;
    let tz = le_f32.parse_next(input)?;
    let name = padded_string(FRAME_NAME_LEN).parse_next(input)?;
    Ok(FrameHeader {
        scale: Vec3::new(sx, sy, sz),
        translate: Vec3::new(tx, ty, tz),
        name,
    })
}

impl KeyframeFrame {
    /// Dequantize a vertex and convert it to the Y-up convention.
    pub fn position(&self, vertex: &KeyframeVertex) -> Vec3 {
        let [x, y, z] = vertex.position.map(f32::from);
        let source = Vec3::new(x, y, z) * self.scale + self.translate;
        z_up_to_y_up(source.x, source.y, source.z)
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices.iter().map(|v| self.position(v))
    }
}

/// The raw contents of a keyframe file.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeFile {
    pub header: KeyframeHeader,
    pub skins: Vec<String>,
    /// Texture coordinates in skin pixels.
    pub texcoords: Vec<[u16; 2]>,
    pub triangles: Vec<KeyframeTriangle>,
    pub frames: Vec<KeyframeFrame>,
}

fn header_count(field: &'static str, value: i32) -> Result<usize, KeyframeError> {
    usize::try_from(value).map_err(|_| KeyframeError::InvalidHeader { field, value })
}

/// Move to the start of a table. An empty table is never read, so its offset
/// is ignored.
fn seek_table(
    reader: &mut LeReader<'_>,
    table: &'static str,
    count: usize,
    field: &'static str,
    offset: i32,
) -> Result<(), KeyframeError> {
    if count == 0 {
        trace!(table, offset, "empty table");
        return Ok(());
    }
    let offset = header_count(field, offset)?;
    let position = reader.position();
    if offset < position {
        return Err(KeyframeError::OffsetOutOfOrder {
            table,
            offset,
            position,
        });
    }
    debug!(table, offset, skipped = offset - position, "seek to table");
    reader.seek_forward(offset)?;
    Ok(())
}

fn read_file(reader: &mut LeReader<'_>, check_magic: bool) -> Result<KeyframeFile, KeyframeError> {
    let header = reader.parse(HEADER_SIZE, parse_header)?;
    if check_magic && header.magic != KEYFRAME_MAGIC {
        return Err(KeyframeError::BadMagic {
            found: header.magic,
        });
    }
    if header.version != KEYFRAME_VERSION {
        return Err(KeyframeError::UnsupportedVersion {
            found: header.version,
            expected: KEYFRAME_VERSION,
        });
    }

    let num_skins = header_count("num_skins", header.num_skins)?;
    let num_vertices = header_count("num_vertices", header.num_vertices)?;
    let num_texcoords = header_count("num_texcoords", header.num_texcoords)?;
    let num_triangles = header_count("num_triangles", header.num_triangles)?;
    let num_frames = header_count("num_frames", header.num_frames)?;
    let frame_size = header_count("frame_size", header.frame_size)?;
    if num_texcoords > 0 {
        for (field, value) in [
            ("skin_width", header.skin_width),
            ("skin_height", header.skin_height),
        ] {
            if value <= 0 {
                return Err(KeyframeError::InvalidHeader { field, value });
            }
        }
    }

    seek_table(reader, "skins", num_skins, "offset_skins", header.offset_skins)?;
    let mut skins = Vec::with_capacity(num_skins.min(reader.remaining() / SKIN_NAME_LEN));
    for _ in 0..num_skins {
        skins.push(reader.read_fixed_string(SKIN_NAME_LEN)?);
    }

    seek_table(reader, "texcoords", num_texcoords, "offset_texcoords", header.offset_texcoords)?;
    let texcoords: Vec<[u16; 2]> = reader.parse(num_texcoords * TEXCOORD_RECORD_SIZE, |i| {
        repeat(num_texcoords, parse_texcoord).parse_next(i)
    })?;

    seek_table(reader, "triangles", num_triangles, "offset_triangles", header.offset_triangles)?;
    let triangles: Vec<KeyframeTriangle> = reader
        .parse(num_triangles * TRIANGLE_RECORD_SIZE, |i| {
            repeat(num_triangles, parse_triangle).parse_next(i)
        })?;

    seek_table(reader, "frames", num_frames, "offset_frames", header.offset_frames)?;
    let frame_bytes = FRAME_HEADER_SIZE + num_vertices * VERTEX_RECORD_SIZE;
    let padding = frame_size.saturating_sub(frame_bytes);
    if frame_size != 0 && frame_size < frame_bytes {
        warn!(frame_size, frame_bytes, "declared frame size is smaller than its vertex data");
    }

    let mut frames = Vec::with_capacity(num_frames.min(reader.remaining() / frame_bytes));
    for _ in 0..num_frames {
        let FrameHeader {
            scale,
            translate,
            name,
        } = reader.parse(FRAME_HEADER_SIZE, parse_frame_header)?;
        let vertices: Vec<KeyframeVertex> = reader
            .parse(num_vertices * VERTEX_RECORD_SIZE, |i| {
                repeat(num_vertices, parse_vertex).parse_next(i)
            })?;
        reader.skip(padding)?;
        frames.push(KeyframeFrame {
            scale,
            translate,
            name,
            vertices,
        });
    }

    Ok(KeyframeFile {
        header,
        skins,
        texcoords,
        triangles,
        frames,
    })
}

/// Read the header and every table of a keyframe file without building a
/// model from it.
pub fn parse_keyframe_file(data: &[u8]) -> Result<KeyframeFile, Report<KeyframeError>> {
    let mut reader = LeReader::new(data);
    read_file(&mut reader, false).map_err(Report::new)
}

/// Decode a keyframe file into a [`Model`] with one object per frame.
///
/// The first object also carries the texture coordinates (normalized to
/// `[0, 1]` with V flipped) and the faces; later frames share that topology.
/// Animation ranges are derived from the frame names.
pub fn decode_keyframe_model(
    data: &[u8],
    options: &KeyframeDecodeOptions,
    textures: &mut TextureRegistry,
) -> Result<Decoded<Model>, Report<KeyframeError>> {
    let mut reader = LeReader::new(data);
    let file = read_file(&mut reader, options.check_magic).map_err(Report::new)?;
    let mut warnings = Vec::new();

    if file.header.magic != KEYFRAME_MAGIC {
        let warning = DecodeWarning::BadMagic {
            found: file.header.magic,
        };
        warn!("{warning}");
        warnings.push(warning);
    }

    let mut model = Model::default();
    if let Some(skin) = options.skin.as_deref() {
        model.materials.push(Material {
            name: skin.to_string(),
            texture_file: skin.to_string(),
            texture: Some(textures.register(skin)),
            ..Default::default()
        });
    }

    let skin_size = Vec2::new(file.header.skin_width as f32, file.header.skin_height as f32);
    for (index, frame) in file.frames.iter().enumerate() {
        let mut object = Object::new(frame.name.clone());
        object.set_vertices(frame.positions());

        if index == 0 {
            for &[u, v] in &file.texcoords {
                let uv = Vec2::new(f32::from(u), f32::from(v)) / skin_size;
                object.push_texcoord(Vec2::new(uv.x, 1.0 - uv.y));
            }
            for triangle in &file.triangles {
                object.push_face(
                    Face::triangle(triangle.vertices.map(u32::from))
                        .with_texcoords(triangle.texcoords.map(u32::from)),
                );
            }
        }

        if !model.materials.is_empty() {
            object.material = Some(0);
            object.has_texture = true;
        }
        model.objects.push(object);
    }

    let names: Vec<&str> = file.frames.iter().map(|f| f.name.as_str()).collect();
    model.animations = extract_animation_ranges(&names);
    debug!(
        frames = model.objects.len(),
        vertices = file.header.num_vertices,
        animations = model.animations.len(),
        "decoded keyframe model"
    );

    Ok(Decoded {
        value: model,
        warnings,
        bytes_read: reader.position(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestFrame {
        name: &'static str,
        scale: [f32; 3],
        translate: [f32; 3],
        vertices: Vec<[u8; 3]>,
    }

    fn frame(name: &'static str, vertices: Vec<[u8; 3]>) -> TestFrame {
        TestFrame {
            name,
            scale: [1.0; 3],
            translate: [0.0; 3],
            vertices,
        }
    }

    #[derive(Default)]
    struct TestFile {
        magic: Option<u32>,
        version: Option<i32>,
        skin: (i32, i32),
        skins: Vec<&'static str>,
        texcoords: Vec<[u16; 2]>,
        triangles: Vec<([u16; 3], [u16; 3])>,
        frames: Vec<TestFrame>,
        /// Extra bytes after each frame, counted in the frame size.
        frame_padding: usize,
        /// Gap between the texcoord and triangle tables.
        table_gap: usize,
    }

    impl TestFile {
        fn encode(&self) -> Vec<u8> {
            let num_vertices = self.frames.first().map_or(0, |f| f.vertices.len());
            let frame_size = FRAME_HEADER_SIZE + num_vertices * 4 + self.frame_padding;
            let offset_skins = HEADER_SIZE;
            let offset_texcoords = offset_skins + self.skins.len() * SKIN_NAME_LEN;
            let offset_triangles = offset_texcoords + self.texcoords.len() * 4 + self.table_gap;
            let offset_frames = offset_triangles + self.triangles.len() * 12;
            let offset_end = offset_frames + self.frames.len() * frame_size;

            let mut out = Vec::new();
            let header = [
                self.magic.unwrap_or(KEYFRAME_MAGIC) as i32,
                self.version.unwrap_or(KEYFRAME_VERSION),
                self.skin.0,
                self.skin.1,
                frame_size as i32,
                self.skins.len() as i32,
                num_vertices as i32,
                self.texcoords.len() as i32,
                self.triangles.len() as i32,
                0,
                self.frames.len() as i32,
                offset_skins as i32,
                offset_texcoords as i32,
                offset_triangles as i32,
                offset_frames as i32,
                offset_end as i32,
                offset_end as i32,
            ];
            for field in header {
                out.extend_from_slice(&field.to_le_bytes());
            }
            for skin in &self.skins {
                let mut field = skin.as_bytes().to_vec();
                field.resize(SKIN_NAME_LEN, 0);
                out.extend(field);
            }
            for [u, v] in &self.texcoords {
                out.extend_from_slice(&u.to_le_bytes());
                out.extend_from_slice(&v.to_le_bytes());
            }
            out.resize(out.len() + self.table_gap, 0xCC);
            for (vertices, texcoords) in &self.triangles {
                for i in vertices.iter().chain(texcoords) {
                    out.extend_from_slice(&i.to_le_bytes());
                }
            }
            for frame in &self.frames {
                for c in frame.scale.iter().chain(&frame.translate) {
                    out.extend_from_slice(&c.to_le_bytes());
                }
                let mut name = frame.name.as_bytes().to_vec();
                name.resize(FRAME_NAME_LEN, 0);
                out.extend(name);
                for v in &frame.vertices {
                    out.extend_from_slice(v);
                    out.push(0);
                }
                out.resize(out.len() + self.frame_padding, 0xEE);
            }
            assert_eq!(out.len(), offset_end);
            out
        }
    }

    fn triangle_file() -> TestFile {
        TestFile {
            skin: (256, 128),
            skins: vec!["models/tris.pcx"],
            texcoords: vec![[0, 0], [64, 32], [256, 128]],
            triangles: vec![([0, 1, 2], [2, 1, 0])],
            frames: vec![
                TestFrame {
                    name: "stand01",
                    scale: [1.0, 2.0, 3.0],
                    translate: [10.0, 20.0, 30.0],
                    vertices: vec![[1, 2, 3], [0, 0, 0], [255, 255, 255]],
                },
                frame("stand02", vec![[0, 0, 0], [1, 0, 0], [0, 1, 0]]),
            ],
            ..Default::default()
        }
    }

    fn decode(data: &[u8]) -> Result<Decoded<Model>, Report<KeyframeError>> {
        decode_keyframe_model(data, &KeyframeDecodeOptions::default(), &mut TextureRegistry::new())
    }

    #[test]
    fn parses_header_and_tables() {
        let data = triangle_file().encode();
        let file = parse_keyframe_file(&data).unwrap();
        assert_eq!(file.header.magic, KEYFRAME_MAGIC);
        assert_eq!(file.header.num_frames, 2);
        assert_eq!(file.skins, ["models/tris.pcx"]);
        assert_eq!(file.texcoords[1], [64, 32]);
        assert_eq!(
            file.triangles,
            [KeyframeTriangle {
                vertices: [0, 1, 2],
                texcoords: [2, 1, 0]
            }]
        );
        assert_eq!(file.frames[1].name, "stand02");
        assert_eq!(file.frames[0].vertices[2].position, [255, 255, 255]);
    }

    #[test]
    fn vertices_are_dequantized_and_remapped() {
        let decoded = decode(&triangle_file().encode()).unwrap();
        let first = &decoded.value.objects[0];
        // (1*1 + 10, 2*2 + 20, 3*3 + 30) in Z-up, then Y/Z swapped with the sign flip.
        assert_eq!(first.vertices[0], Vec3::new(11.0, 39.0, -24.0));
        assert_eq!(first.vertices[1], Vec3::new(10.0, 30.0, -20.0));
        assert_eq!(first.bounds.max.x, 265.0);
    }

    #[test]
    fn first_frame_carries_topology() {
        let data = triangle_file().encode();
        let decoded = decode(&data).unwrap();
        assert!(decoded.warnings.is_empty());
        assert_eq!(decoded.bytes_read, data.len());

        let model = decoded.value;
        assert_eq!(model.objects.len(), 2);
        let first = &model.objects[0];
        assert_eq!(first.name, "stand01");
        assert_eq!(first.faces.len(), 1);
        assert_eq!(first.faces[0].vertices, [0, 1, 2]);
        assert_eq!(first.faces[0].texcoords.as_deref(), Some(&[2, 1, 0][..]));
        assert_eq!(
            first.texcoords,
            [Vec2::new(0.0, 1.0), Vec2::new(0.25, 0.75), Vec2::new(1.0, 0.0)]
        );

        let second = &model.objects[1];
        assert_eq!(second.vertices.len(), 3);
        assert!(second.faces.is_empty());
        assert!(second.texcoords.is_empty());
        assert_eq!(second.vertices[2], Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn animation_ranges_from_frame_names() {
        let names = ["walk1", "walk2", "walk3", "run1", "run2"];
        let file = TestFile {
            frames: names.iter().map(|&n| frame(n, vec![[0, 0, 0]])).collect(),
            ..Default::default()
        };
        let model = decode(&file.encode()).unwrap().value;
        assert_eq!(model.objects.len(), 5);
        let ranges: Vec<_> = model
            .animations
            .iter()
            .map(|a| (a.name.as_str(), a.start_frame, a.end_frame))
            .collect();
        assert_eq!(ranges, [("walk", 0, 2), ("run", 3, 4)]);
        assert_eq!(model.find_animation("RUN").map(|a| a.start_frame), Some(3));
    }

    #[test]
    fn wrong_version_is_fatal() {
        let file = TestFile {
            version: Some(7),
            ..triangle_file()
        };
        let err = decode(&file.encode()).unwrap_err();
        assert!(matches!(
            err.current_context(),
            KeyframeError::UnsupportedVersion { found: 7, expected: 8 }
        ));
    }

    #[test]
    fn bad_magic_warns_unless_checked() {
        let data = TestFile {
            magic: Some(0x1234_5678),
            ..triangle_file()
        }
        .encode();
        let decoded = decode(&data).unwrap();
        assert_eq!(decoded.warnings, [DecodeWarning::BadMagic { found: 0x1234_5678 }]);

        let options = KeyframeDecodeOptions::builder().check_magic(true).build();
        let err = decode_keyframe_model(&data, &options, &mut TextureRegistry::new()).unwrap_err();
        assert!(matches!(err.current_context(), KeyframeError::BadMagic { .. }));
    }

    #[test]
    fn skin_becomes_the_only_material() {
        let options = KeyframeDecodeOptions::builder().skin("Knight.PCX".to_string()).build();
        let mut textures = TextureRegistry::new();
        textures.register("other.tga");
        let model = decode_keyframe_model(&triangle_file().encode(), &options, &mut textures)
            .unwrap()
            .value;

        assert_eq!(model.materials.len(), 1);
        assert_eq!(model.materials[0].texture_file, "Knight.PCX");
        assert_eq!(model.materials[0].texture, textures.get("knight.pcx"));
        assert!(model.objects.iter().all(|o| o.material == Some(0) && o.has_texture));
    }

    #[test]
    fn frame_padding_and_table_gaps_are_skipped() {
        let file = TestFile {
            frame_padding: 8,
            table_gap: 6,
            ..triangle_file()
        };
        let data = file.encode();
        let model = decode(&data).unwrap().value;
        assert_eq!(model.objects[1].name, "stand02");
        assert_eq!(model.objects[1].vertices[1], Vec3::new(1.0, 0.0, -0.0));
        assert_eq!(model.objects[0].faces[0].vertices, [0, 1, 2]);
    }

    #[test]
    fn truncated_file_is_an_error() {
        let data = triangle_file().encode();
        let err = decode(&data[..data.len() - 1]).unwrap_err();
        assert!(matches!(err.current_context(), KeyframeError::Read(_)));

        let err = decode(&data[..20]).unwrap_err();
        assert!(matches!(err.current_context(), KeyframeError::Read(_)));
    }

    #[test]
    fn backwards_offsets_are_rejected() {
        let mut data = triangle_file().encode();
        // offset_triangles is the 14th field; point it into the header.
        data[52..56].copy_from_slice(&4i32.to_le_bytes());
        let err = decode(&data).unwrap_err();
        assert!(matches!(
            err.current_context(),
            KeyframeError::OffsetOutOfOrder { table: "triangles", offset: 4, .. }
        ));
    }

    #[test]
    fn empty_tables_ignore_their_offsets() {
        let mut data = TestFile {
            skins: Vec::new(),
            ..triangle_file()
        }
        .encode();
        // offset_skins is the 12th field.
        data[44..48].copy_from_slice(&0i32.to_le_bytes());
        let decoded = decode(&data).unwrap();
        assert_eq!(decoded.value.objects.len(), 2);
        assert_eq!(decoded.value.objects[0].faces.len(), 1);
        assert_eq!(decoded.bytes_read, data.len());
    }

    #[test]
    fn checked_magic_fails_before_the_tables() {
        let junk = vec![0x41u8; HEADER_SIZE];
        let options = KeyframeDecodeOptions::builder().check_magic(true).build();
        let err = decode_keyframe_model(&junk, &options, &mut TextureRegistry::new()).unwrap_err();
        assert!(matches!(
            err.current_context(),
            KeyframeError::BadMagic { found: 0x4141_4141 }
        ));

        let err = decode(&junk).unwrap_err();
        assert!(matches!(
            err.current_context(),
            KeyframeError::UnsupportedVersion { .. }
        ));
    }

    #[test]
    fn negative_counts_are_rejected() {
        let mut data = triangle_file().encode();
        data[24..28].copy_from_slice(&(-1i32).to_le_bytes());
        let err = decode(&data).unwrap_err();
        assert!(matches!(
            err.current_context(),
            KeyframeError::InvalidHeader { field: "num_vertices", value: -1 }
        ));
    }
}
