use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use glam::Vec3;
use rayon::prelude::*;
use rootcause::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use modelkit::math::collision::{line_intersects_polygon, sphere_polygon_contact};
use modelkit::models::chunked::ChunkDecodeOptions;
use modelkit::models::keyframe::KeyframeDecodeOptions;
use modelkit::{LoadOptions, LoadedModel, Model, ModelFormat, TextureRegistry, load_model};

/// Inspect chunked (.3ds) and keyframe (.md2) models and run collision queries against them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode model files and print a summary of each
    Info {
        /// Model file(s)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        decode: DecodeArgs,
    },

    /// Report the first face hit by a line segment
    Ray {
        file: PathBuf,

        /// Segment start as x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        from: Vec3,

        /// Segment end as x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        to: Vec3,

        #[command(flatten)]
        decode: DecodeArgs,
    },

    /// Report every face a sphere collides with and the offset that pushes it out
    Sphere {
        file: PathBuf,

        /// Sphere center as x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        center: Vec3,

        #[arg(long)]
        radius: f32,

        #[command(flatten)]
        decode: DecodeArgs,
    },
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Treat a bad chunk signature or a truncated chunked file as an error
    #[arg(long)]
    strict: bool,

    /// Texture file to attach to keyframe models
    #[arg(long)]
    skin: Option<String>,
}

impl DecodeArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            chunked: ChunkDecodeOptions::builder().strict(self.strict).build(),
            keyframe: KeyframeDecodeOptions::builder()
                .maybe_skin(self.skin.clone())
                .build(),
        }
    }
}

fn parse_vec3(value: &str) -> Result<Vec3, String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f32>().map_err(|e| format!("{part:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match parts[..] {
        [x, y, z] => Ok(Vec3::new(x, y, z)),
        _ => Err(format!("expected x,y,z, got {value:?}")),
    }
}

#[derive(Serialize)]
struct ObjectSummary {
    name: String,
    vertices: usize,
    faces: usize,
    texcoords: usize,
    material: Option<String>,
    bounds: Option<[[f32; 3]; 2]>,
}

#[derive(Serialize)]
struct ModelSummary {
    path: PathBuf,
    format: ModelFormat,
    bytes_read: usize,
    objects: Vec<ObjectSummary>,
    materials: Vec<String>,
    animations: Vec<(String, usize, usize)>,
    textures: Vec<String>,
    warnings: Vec<String>,
}

impl ModelSummary {
    fn new(path: &Path, loaded: &LoadedModel, textures: &TextureRegistry) -> Self {
        let model = &loaded.model.value;
        let objects = model
            .objects
            .iter()
            .map(|object| ObjectSummary {
                name: object.name.clone(),
                vertices: object.vertices.len(),
                faces: object.faces.len(),
                texcoords: object.texcoords.len(),
                material: object
                    .material
                    .and_then(|i| model.materials.get(i))
                    .map(|m| m.name.clone()),
                bounds: (!object.bounds.is_empty())
                    .then(|| [object.bounds.min.to_array(), object.bounds.max.to_array()]),
            })
            .collect();

        Self {
            path: path.to_path_buf(),
            format: loaded.format,
            bytes_read: loaded.model.bytes_read,
            objects,
            materials: model.materials.iter().map(|m| m.name.clone()).collect(),
            animations: model
                .animations
                .iter()
                .map(|a| (a.name.clone(), a.start_frame, a.end_frame))
                .collect(),
            textures: textures.iter().map(|(_, name)| name.to_string()).collect(),
            warnings: loaded
                .model
                .warnings
                .iter()
                .filter(|w| !w.is_informational())
                .map(ToString::to_string)
                .collect(),
        }
    }

    fn print(&self) {
        println!("{} ({:?}, {} bytes)", self.path.display(), self.format, self.bytes_read);
        for object in &self.objects {
            println!(
                "  object {:?}: {} vertices, {} faces, {} texcoords, material {}",
                object.name,
                object.vertices,
                object.faces,
                object.texcoords,
                object.material.as_deref().unwrap_or("-"),
            );
        }
        for material in &self.materials {
            println!("  material {material:?}");
        }
        for (name, start, end) in &self.animations {
            println!("  animation {name:?}: frames {start}..={end}");
        }
        for texture in &self.textures {
            println!("  texture {texture}");
        }
        for warning in &self.warnings {
            println!("  warning: {warning}");
        }
    }
}

fn load(path: &Path, decode: &DecodeArgs) -> Result<(LoadedModel, TextureRegistry), Report> {
    let mut textures = TextureRegistry::new();
    let loaded = load_model(path, &decode.load_options(), &mut textures)
        .context_with(|| format!("Failed to load {}", path.display()))?;
    for warning in loaded.model.warnings.iter().filter(|w| !w.is_informational()) {
        warn!(path = %path.display(), "{warning}");
    }
    Ok((loaded, textures))
}

fn run_info(files: &[PathBuf], json: bool, decode: &DecodeArgs) -> Result<(), Report> {
    let results: Vec<_> = files
        .par_iter()
        .map(|path| {
            load(path, decode).map(|(loaded, textures)| ModelSummary::new(path, &loaded, &textures))
        })
        .collect();

    let mut summaries = Vec::with_capacity(results.len());
    let mut failed = 0;
    for result in results {
        match result {
            Ok(summary) => summaries.push(summary),
            Err(report) => {
                failed += 1;
                eprintln!("{report}");
            }
        }
    }

    if json {
        let out = serde_json::to_string_pretty(&summaries).context("Failed to serialize summary")?;
        println!("{out}");
    } else {
        summaries.iter().for_each(ModelSummary::print);
    }

    if failed > 0 {
        return Err(rootcause::report!("{} of {} files failed to load", failed, files.len()));
    }
    Ok(())
}

/// Every face polygon of every object, tagged with where it came from.
fn polygons(model: &Model) -> impl Iterator<Item = (&str, usize, Vec<Vec3>)> + '_ {
    model.objects.iter().flat_map(|object| {
        object
            .polygons()
            .map(move |(face, polygon)| (object.name.as_str(), face, polygon))
    })
}

fn run_ray(file: &Path, line: [Vec3; 2], decode: &DecodeArgs) -> Result<(), Report> {
    let (loaded, _) = load(file, decode)?;
    let hit = polygons(&loaded.model.value).find_map(|(object, face, polygon)| {
        line_intersects_polygon(&polygon, line).map(|point| (object, face, point))
    });

    match hit {
        Some((object, face, point)) => {
            println!("hit {object:?} face {face} at {point}");
        }
        None => println!("no hit"),
    }
    Ok(())
}

fn run_sphere(file: &Path, center: Vec3, radius: f32, decode: &DecodeArgs) -> Result<(), Report> {
    let (loaded, _) = load(file, decode)?;
    let mut hits = 0;
    for (object, face, polygon) in polygons(&loaded.model.value) {
        if let Some(offset) = sphere_polygon_contact(&polygon, center, radius) {
            hits += 1;
            println!("hit {object:?} face {face}, push out by {offset}");
        }
    }
    info!(hits, "sphere query finished");
    if hits == 0 {
        println!("no hit");
    }
    Ok(())
}

fn main() -> Result<(), Report> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Info {
            files,
            json,
            decode,
        } => run_info(&files, json, &decode),
        Command::Ray {
            file,
            from,
            to,
            decode,
        } => run_ray(&file, [from, to], &decode),
        Command::Sphere {
            file,
            center,
            radius,
            decode,
        } => run_sphere(&file, center, radius, &decode),
    }
}
