//! In-memory model representation shared by both decoders.
//!
//! Coordinates are Y-up. Decoders convert from the Z-up authoring convention
//! while reading, see [`z_up_to_y_up`].

use glam::{Vec2, Vec3};

use crate::math::vector::polygon_normal;
use crate::models::texture::TextureHandle;

/// Shininess range used by authoring tools.
pub const SOURCE_SHININESS_MAX: f32 = 1000.0;
/// Shininess range accepted by the renderer.
pub const ENGINE_SHININESS_MAX: f32 = 128.0;

/// Convert a Z-up authoring position to the engine's Y-up convention.
///
/// Source Z becomes engine Y, and source Y becomes engine Z with its sign
/// flipped so the handedness is preserved.
pub fn z_up_to_y_up(x: f32, y: f32, z: f32) -> Vec3 {
    Vec3::new(x, z, -y)
}

/// Axis-aligned bounds of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    /// Bounds containing nothing; the first [`extend`](Self::extend) replaces it.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }
}

/// A polygon as indices into its object's vertex, texcoord and normal lists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Face {
    pub vertices: Vec<u32>,
    pub texcoords: Option<Vec<u32>>,
    pub normals: Option<Vec<u32>>,
    /// Index into [`Model::materials`].
    pub material: Option<usize>,
}

impl Face {
    pub fn triangle(vertices: [u32; 3]) -> Self {
        Self {
            vertices: vertices.to_vec(),
            ..Default::default()
        }
    }

    pub fn with_texcoords(mut self, texcoords: [u32; 3]) -> Self {
        self.texcoords = Some(texcoords.to_vec());
        self
    }

    /// Build a face from 1-based source indices.
    ///
    /// Returns `None` if any index is 0, which has no 0-based equivalent.
    pub fn from_one_based(
        vertices: &[u32],
        texcoords: Option<&[u32]>,
        normals: Option<&[u32]>,
    ) -> Option<Self> {
        fn rebase(indices: &[u32]) -> Option<Vec<u32>> {
            indices.iter().map(|i| i.checked_sub(1)).collect()
        }

        let texcoords = match texcoords {
            Some(indices) => Some(rebase(indices)?),
            None => None,
        };
        let normals = match normals {
            Some(indices) => Some(rebase(indices)?),
            None => None,
        };
        Some(Self {
            vertices: rebase(vertices)?,
            texcoords,
            normals,
            material: None,
        })
    }
}

/// Surface description referenced by objects and faces.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    pub name: String,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    /// Specular exponent in the renderer's `[0, 128]` range.
    pub shininess: f32,
    pub alpha: f32,
    /// Texture filename as stored in the asset, empty when untextured.
    pub texture_file: String,
    pub texture: Option<TextureHandle>,
    pub u_tile: f32,
    pub v_tile: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient: Vec3::splat(0.2),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::ZERO,
            shininess: 0.0,
            alpha: 1.0,
            texture_file: String::new(),
            texture: None,
            u_tile: 1.0,
            v_tile: 1.0,
        }
    }
}

impl Material {
    pub fn has_texture(&self) -> bool {
        !self.texture_file.is_empty()
    }

    /// Set shininess from an authoring-tool value in `[0, 1000]`.
    pub fn set_shininess_from_source(&mut self, value: f32) {
        let value = value.clamp(0.0, SOURCE_SHININESS_MAX);
        self.shininess = value / SOURCE_SHININESS_MAX * ENGINE_SHININESS_MAX;
    }
}

/// A named mesh: one sub-mesh of a chunked model, or one frame of a keyframe
/// model.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Object {
    pub name: String,
    pub vertices: Vec<Vec3>,
    /// Per-vertex normals; empty until computed.
    pub normals: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
    pub faces: Vec<Face>,
    /// Index into [`Model::materials`], `None` when unassigned or unresolved.
    pub material: Option<usize>,
    pub has_texture: bool,
    pub bounds: BoundingBox,
}

impl Object {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn push_vertex(&mut self, vertex: Vec3) {
        self.bounds.extend(vertex);
        self.vertices.push(vertex);
    }

    /// Replace all vertices, recomputing the bounds.
    pub fn set_vertices(&mut self, vertices: impl IntoIterator<Item = Vec3>) {
        self.vertices.clear();
        self.bounds = BoundingBox::empty();
        self.extend_vertices(vertices);
    }

    pub fn extend_vertices(&mut self, vertices: impl IntoIterator<Item = Vec3>) {
        for vertex in vertices {
            self.push_vertex(vertex);
        }
    }

    pub fn push_texcoord(&mut self, texcoord: Vec2) {
        self.texcoords.push(texcoord);
    }

    pub fn push_face(&mut self, face: Face) {
        self.faces.push(face);
    }

    /// Vertex positions of one face, or `None` if the face is missing or
    /// references a vertex that does not exist.
    pub fn polygon(&self, face: usize) -> Option<Vec<Vec3>> {
        self.faces
            .get(face)?
            .vertices
            .iter()
            .map(|&i| self.vertices.get(i as usize).copied())
            .collect()
    }

    /// `(face index, vertex positions)` for every face with valid indices.
    pub fn polygons(&self) -> impl Iterator<Item = (usize, Vec<Vec3>)> + '_ {
        (0..self.faces.len()).filter_map(|i| self.polygon(i).map(|p| (i, p)))
    }

    /// Recompute smooth per-vertex normals.
    ///
    /// Each vertex gets the normalized sum of the unit normals of the faces
    /// that use it. Vertices used by no face get a zero normal.
    pub fn compute_normals(&mut self) {
        let mut sums = vec![Vec3::ZERO; self.vertices.len()];
        for (i, polygon) in self.polygons() {
            let normal = polygon_normal(&polygon);
            for &index in &self.faces[i].vertices {
                sums[index as usize] += normal;
            }
        }
        self.normals = sums.into_iter().map(Vec3::normalize_or_zero).collect();
    }
}

/// A contiguous block of frames forming one named animation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationRange {
    pub name: String,
    pub start_frame: usize,
    /// Inclusive.
    pub end_frame: usize,
}

/// A decoded model: objects, the materials they reference and, for keyframe
/// models, the named animation ranges over the objects.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Model {
    pub objects: Vec<Object>,
    pub materials: Vec<Material>,
    pub animations: Vec<AnimationRange>,
}

impl Model {
    /// Index of the first material named `name`, ignoring ASCII case.
    pub fn find_material(&self, name: &str) -> Option<usize> {
        self.materials
            .iter()
            .position(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn find_animation(&self, name: &str) -> Option<&AnimationRange> {
        self.animations
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn vertex_count(&self) -> usize {
        self.objects.iter().map(|o| o.vertices.len()).sum()
    }

    pub fn face_count(&self) -> usize {
        self.objects.iter().map(|o| o.faces.len()).sum()
    }

    /// Union of every object's bounds.
    pub fn bounds(&self) -> BoundingBox {
        let mut bounds = BoundingBox::empty();
        for object in self.objects.iter().filter(|o| !o.bounds.is_empty()) {
            bounds.extend(object.bounds.min);
            bounds.extend(object.bounds.max);
        }
        bounds
    }
}
