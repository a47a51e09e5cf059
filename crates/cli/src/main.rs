mod color;
mod render;
mod scene;

use crate::scene::{SceneConfig, TiledScene};
use anyhow::{bail, Context};
use hexfloor::{timed, BoundaryId, ContainmentStrategy, HexPlacement};
use log::LevelFilter;
use serde::Serialize;
use simple_logger::SimpleLogger;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    process,
};
use structopt::StructOpt;
use strum::{Display, EnumString};

/// CLI for tiling recorded plane scenes with hexagons.
#[derive(Debug, StructOpt)]
#[structopt(name = "hexfloor")]
struct Opt {
    /// Path to a scene file that defines the planes to be tiled, along with
    /// the tiling config and color palette. Supported formats: JSON, TOML
    #[structopt(short, long)]
    scene: PathBuf,

    /// If given, the tiled scene will be saved to this directory. The exact
    /// files that appear in the directory are defined by the output formats.
    /// See `--output-formats` for more info
    #[structopt(short, long)]
    output: Option<PathBuf>,

    /// The format(s) to output the scene in. Supported formats:
    ///
    /// cfg - The tiling config that was used, in TOML format
    ///
    /// json - Every hexagon placement, grouped by plane
    ///
    /// svg - 2D top-down rendering of the planes and their tiles
    #[structopt(short = "f", long)]
    output_formats: Vec<OutputFormat>,

    /// Override the containment strategy from the scene file. Options:
    /// mesh_probe, outline_winding
    #[structopt(long)]
    containment: Option<ContainmentStrategy>,

    /// The logging level to use. See
    /// https://docs.rs/log/0.4.11/log/enum.LevelFilter.html for options
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,
}

/// Different output formats.
#[derive(Copy, Clone, Debug, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
enum OutputFormat {
    // If you change this, make sure to update the help text for
    // `--output-formats`!
    /// Export the tiling config in a human-readable file
    Cfg,
    /// Export all placements as JSON
    Json,
    /// Render the scene as a 2D SVG
    Svg,
}

impl OutputFormat {
    fn file_ext(self) -> &'static str {
        match self {
            Self::Cfg => "toml",
            Self::Json => "json",
            Self::Svg => "svg",
        }
    }
}

/// JSON output for a whole scene
#[derive(Serialize)]
struct PlacementOutput<'a> {
    boundaries: Vec<BoundaryOutput<'a>>,
}

#[derive(Serialize)]
struct BoundaryOutput<'a> {
    id: &'a BoundaryId,
    placements: &'a [HexPlacement],
}

/// Generate an output form of the scene in the given format.
fn gen_output(
    output_dir: &Path,
    output_format: OutputFormat,
    scene: &SceneConfig,
    tiled: &TiledScene,
) -> anyhow::Result<()> {
    fn generate_bytes(
        output_format: OutputFormat,
        scene: &SceneConfig,
        tiled: &TiledScene,
    ) -> anyhow::Result<Vec<u8>> {
        Ok(match output_format {
            OutputFormat::Cfg => toml::to_string_pretty(&scene.tiling)
                .context("error serializing config")?
                .into_bytes(),
            OutputFormat::Json => {
                let output = PlacementOutput {
                    boundaries: tiled
                        .registry
                        .boundary_ids()
                        .map(|id| BoundaryOutput {
                            id,
                            placements: tiled.registry.placements(id),
                        })
                        .collect(),
                };
                serde_json::to_vec_pretty(&output)
                    .context("error serializing placements")?
            }
            OutputFormat::Svg => {
                crate::render::scene_to_svg(tiled).to_string().into_bytes()
            }
        })
    }

    let output_file_path = output_dir
        .join("scene")
        .with_extension(output_format.file_ext());

    timed!(
        format!(
            "Generating {} output and writing to {:?}",
            output_format, &output_file_path
        ),
        log::Level::Info,
        {
            let bytes = generate_bytes(output_format, scene, tiled)?;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&output_file_path)
                .with_context(|| {
                    format!("error opening output file {:?}", &output_file_path)
                })?;
            file.write_all(&bytes).with_context(|| {
                format!("error writing to file {:?}", &output_file_path)
            })?;
        }
    );

    Ok(())
}

/// Run the CLI with some options
fn run(opt: Opt) -> anyhow::Result<()> {
    SimpleLogger::new().with_level(opt.log_level).init()?;

    let mut scene = SceneConfig::load(&opt.scene)?;
    if let Some(containment) = opt.containment {
        scene.tiling.containment = containment;
    }
    let tiled = timed!(
        format!("Tiling scene {:?}", &opt.scene),
        log::Level::Info,
        crate::scene::replay(&scene)?
    );

    // If an output dir was specified, write out output format(s) there
    if let Some(output_dir) = opt.output {
        if opt.output_formats.is_empty() {
            bail!("output dir was specified, but no output formats were given")
        }
        fs::create_dir_all(&output_dir)?;

        for output_format in opt.output_formats {
            gen_output(&output_dir, output_format, &scene, &tiled)?;
        }
    }

    Ok(())
}

fn main() {
    let exit_code = match run(Opt::from_args()) {
        Ok(_) => 0,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            1
        }
    };
    process::exit(exit_code);
}
