//! Load scene documents and resolve them into geometry.
//!
//! Usage: mosaic [--flatten] [--options <file.json>] <scene.xml>...

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use mosaic_core::{finalize, load_scene, FinalizeOptions, Model};
use mosaic_math::Aabb;

struct Args {
    flatten: bool,
    options: Option<PathBuf>,
    documents: Vec<PathBuf>,
}

fn parse_args() -> Result<Option<Args>> {
    let mut args = Args {
        flatten: false,
        options: None,
        documents: Vec::new(),
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--flatten" => args.flatten = true,
            "--options" => {
                let path = iter.next().context("--options needs a file argument")?;
                args.options = Some(PathBuf::from(path));
            }
            "-h" | "--help" => return Ok(None),
            other if other.starts_with("--") => bail!("unknown flag {other}"),
            other => args.documents.push(PathBuf::from(other)),
        }
    }

    if args.documents.is_empty() {
        return Ok(None);
    }
    Ok(Some(args))
}

fn print_usage() {
    println!("Usage: mosaic [--flatten] [--options <file.json>] <scene.xml>...");
    println!("\nOptions file example:");
    println!(r#"  {{ "flatten": false, "position_step_limit": {{ "max_steps": 2, "exempt_materials": ["wheel"] }} }}"#);
}

fn read_options(path: Option<&Path>) -> Result<FinalizeOptions> {
    let Some(path) = path else {
        return Ok(FinalizeOptions::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading options {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing options {}", path.display()))
}

fn format_bounds(bounds: &Aabb) -> String {
    if bounds.is_empty() {
        return "empty".to_string();
    }
    let (min, max) = (bounds.min(), bounds.max());
    format!(
        "({:.2}, {:.2}, {:.2}) to ({:.2}, {:.2}, {:.2})",
        min.x, min.y, min.z, max.x, max.y, max.z
    )
}

fn run(document: &Path, options: &FinalizeOptions) -> Result<()> {
    let loaded = load_scene(document).with_context(|| format!("loading {}", document.display()))?;

    let mut model = Model::new();
    let resolution = finalize(&loaded.scene, options, &mut model)
        .with_context(|| format!("finalizing {}", document.display()))?;
    model.commit();

    println!("\n=== {} ===", document.display());
    println!("Objects: {}", loaded.scene.object_count());
    println!("Meshes: {}", loaded.scene.mesh_count());
    println!("Flattened geometries: {}", resolution.flattened_count());
    println!("Instances: {}", resolution.instance_count());
    println!("Scene bounds: {}", format_bounds(&loaded.bounds));
    println!("Resolved bounds: {}", format_bounds(&resolution.bounds));
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let Some(args) = parse_args()? else {
        print_usage();
        return Ok(());
    };

    let mut options = read_options(args.options.as_deref())?;
    if args.flatten {
        options.flatten = true;
    }
    log::info!("Finalize options: {:?}", options);

    for document in &args.documents {
        run(document, &options)?;
    }
    Ok(())
}
