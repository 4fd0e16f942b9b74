//! hybrid-face CLI: blend a far and a near photograph into a hybrid image.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use ndarray::Array3;

use hybrid_face::{Emphasis, FaceBox, FixedDetector, HybridComposer, HybridConfig};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmphasisArg {
    Far,
    Balanced,
    Near,
}

impl From<EmphasisArg> for Emphasis {
    fn from(arg: EmphasisArg) -> Self {
        match arg {
            EmphasisArg::Far => Emphasis::Far,
            EmphasisArg::Balanced => Emphasis::Balanced,
            EmphasisArg::Near => Emphasis::Near,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "hybrid-face")]
#[command(about = "Command-line tool for creating hybrid images")]
#[command(version)]
struct Cli {
    /// Path to the image that should be seen from anear.
    #[arg(short, long, value_name = "NEAR_IMAGE")]
    near: PathBuf,

    /// Path to the image that should be seen from afar.
    #[arg(short, long, value_name = "FAR_IMAGE")]
    far: PathBuf,

    /// Whether the near or the far image should be emphasized (default: balanced).
    #[arg(long, value_enum)]
    emphasis: Option<EmphasisArg>,

    /// Output file for the resulting image (e.g. "result.png").
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// TOML file with sigma, alpha, ignore_faces and crop_margin.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Weight of the near image in the blend, in [0, 1].
    #[arg(long)]
    alpha: Option<f64>,

    /// Pixels removed from each side before blending.
    #[arg(long)]
    crop_margin: Option<usize>,

    /// Filter the whole frames instead of cropping to the faces.
    #[arg(long)]
    ignore_faces: bool,

    /// Face box of the far image, as found by an external detector.
    #[arg(long, value_name = "TOP,RIGHT,BOTTOM,LEFT", value_parser = parse_face)]
    far_face: Option<FaceBox>,

    /// Face box of the near image, as found by an external detector.
    #[arg(long, value_name = "TOP,RIGHT,BOTTOM,LEFT", value_parser = parse_face)]
    near_face: Option<FaceBox>,
}

fn parse_face(text: &str) -> Result<FaceBox, String> {
    FaceBox::parse(text).map_err(|e| e.to_string())
}

impl Cli {
    fn to_config(&self) -> CliResult<HybridConfig> {
        let mut config = match &self.config {
            Some(path) => {
                log::info!("Loading config: {}", path.display());
                HybridConfig::load_from_file(path)?
            }
            None => HybridConfig::default(),
        };

        if let Some(emphasis) = self.emphasis {
            config = config.with_emphasis(emphasis.into());
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(margin) = self.crop_margin {
            config.crop_margin = margin;
        }
        if self.ignore_faces {
            config.ignore_faces = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// Detectors for the far and near image; face mode needs both boxes.
    fn detectors(
        &self,
        config: &HybridConfig,
    ) -> CliResult<(Arc<FixedDetector>, Arc<FixedDetector>)> {
        if config.ignore_faces {
            return Ok((
                Arc::new(FixedDetector::default()),
                Arc::new(FixedDetector::default()),
            ));
        }

        match (self.far_face, self.near_face) {
            (Some(far), Some(near)) => Ok((
                Arc::new(FixedDetector::single(far)),
                Arc::new(FixedDetector::single(near)),
            )),
            _ => Err("face mode needs both --far-face and --near-face \
                 (TOP,RIGHT,BOTTOM,LEFT); pass --ignore-faces to filter whole frames"
                .into()),
        }
    }
}

fn load_rgba(path: &Path) -> CliResult<Array3<u8>> {
    log::info!("Loading image: {}", path.display());
    let img = image::open(path).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", path.display(), e).into()
    })?;
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    log::info!("Image size: {}x{}", w, h);

    Ok(Array3::from_shape_vec(
        (h as usize, w as usize, 4),
        rgba.into_raw(),
    )?)
}

fn save_rgba(path: &Path, data: Array3<u8>) -> CliResult<()> {
    let (h, w, _) = data.dim();
    let (raw, _) = data.into_raw_vec_and_offset();
    let img = image::RgbaImage::from_raw(w as u32, h as u32, raw)
        .ok_or_else(|| -> CliError { format!("Invalid output buffer for {w}x{h}").into() })?;
    img.save(path).map_err(|e| -> CliError {
        format!("Failed to write {}: {}", path.display(), e).into()
    })?;
    log::info!("Wrote {}x{} image to {}", w, h, path.display());
    Ok(())
}

fn main() -> CliResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.to_config()?;
    let (far_detector, near_detector) = cli.detectors(&config)?;

    let far = load_rgba(&cli.far)?;
    let near = load_rgba(&cli.near)?;

    let mut composer = HybridComposer::with_detectors(config, far_detector, near_detector)?;
    let hybrid = composer.compose(far.view(), near.view())?;

    match &cli.output {
        Some(path) => save_rgba(path, hybrid)?,
        None => {
            let (h, w, _) = hybrid.dim();
            log::warn!("No --output given, discarding {}x{} result", w, h);
        }
    }

    Ok(())
}
