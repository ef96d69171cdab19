use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use zonewatch::alert::{dispatch_alerts, AlertConfig};
use zonewatch::compose::encode_png;
use zonewatch::detect::DetectionOverrides;
use zonewatch::logger::init_logger_exe;
use zonewatch::mask::decode_mask;
use zonewatch::{ChangeDetector, DetectionConfig};
use zonewatch_tools::database::ZoneMaskCache;

#[derive(Parser)]
#[command(version, about = "Detect unauthorized change inside a protected zone between two images", long_about = None)]
struct Cli {
    #[arg(long, help = "base (reference) image, png or jpeg")]
    base: PathBuf,
    #[arg(long, help = "test (current) image, png or jpeg")]
    test: PathBuf,
    #[arg(long, help = "JSON detection config, applied before the flags below")]
    config: Option<PathBuf>,
    #[arg(long, help = "zone mask strategy: intensity | edge")]
    mask_strategy: Option<String>,
    #[arg(long, help = "diff strategy: absdiff | ssim")]
    diff_strategy: Option<String>,
    #[arg(long, help = "intensity below which a pixel belongs to the zone")]
    zone_threshold: Option<u8>,
    #[arg(long, help = "buffer (dilation) width in pixels")]
    dilation_width: Option<u32>,
    #[arg(long, help = "pixel difference threshold")]
    diff_threshold: Option<u8>,
    #[arg(long, help = "gaussian blur sigma applied to the absolute difference")]
    blur_sigma: Option<f32>,
    #[arg(long, help = "change percentage above which an alert is raised")]
    alert_threshold: Option<f64>,
    #[arg(long, help = "empty zone handling: error | zero")]
    empty_zone: Option<String>,
    #[arg(long, help = "artifact rendering: overlap | zone_composite | annotated")]
    render: Option<String>,
    #[arg(long, help = "where to write the result image (png)")]
    output: Option<PathBuf>,
    #[arg(long, help = "use this zone mask image instead of generating one")]
    mask: Option<PathBuf>,
    #[arg(long, help = "write the zone mask used for this run (png)")]
    save_mask: Option<PathBuf>,
    #[arg(long, help = "cache the zone mask under this id, or reuse the cached one")]
    zone_id: Option<String>,
    #[arg(long, help = "mask cache database (defaults to ~/.zonewatch/zone_masks.db)")]
    cache_db: Option<PathBuf>,
    #[arg(long, default_value_t = false, help = "send alerts configured through ZONEWATCH_* variables")]
    notify: bool,
    #[arg(long, default_value_t = false, help = "print the result summary as JSON")]
    json: bool,
}

impl Cli {
    fn overrides(&self) -> DetectionOverrides {
        DetectionOverrides {
            mask_strategy: self.mask_strategy.clone(),
            diff_strategy: self.diff_strategy.clone(),
            zone_intensity_threshold: self.zone_threshold,
            dilation_width: self.dilation_width,
            diff_threshold: self.diff_threshold,
            blur_sigma: self.blur_sigma,
            alert_threshold: self.alert_threshold,
            empty_zone_policy: self.empty_zone.clone(),
            render_mode: self.render.clone(),
            ..Default::default()
        }
    }
}

fn load_config(cli: &Cli) -> Result<DetectionConfig> {
    let base = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            DetectionConfig::from_json(&json)?
        }
        None => DetectionConfig::default(),
    };
    Ok(cli.overrides().apply(&base)?)
}

fn main() -> Result<()> {
    init_logger_exe();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let detector = ChangeDetector::new(config)?;

    let base_bytes = std::fs::read(&cli.base)
        .with_context(|| format!("Failed to read base image {}", cli.base.display()))?;
    let test_bytes = std::fs::read(&cli.test)
        .with_context(|| format!("Failed to read test image {}", cli.test.display()))?;

    let cache = match (&cli.zone_id, &cli.cache_db) {
        (Some(_), Some(path)) => Some(ZoneMaskCache::open(path)?),
        (Some(_), None) => Some(ZoneMaskCache::open_default()?),
        (None, _) => None,
    };

    let zone = if let Some(path) = &cli.mask {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read mask {}", path.display()))?;
        Some(decode_mask(&bytes)?)
    } else if let (Some(zone_id), Some(cache)) = (&cli.zone_id, &cache) {
        match cache.load(zone_id)? {
            Some(mask) => {
                log::info!("Using cached mask for zone {}", zone_id);
                Some(mask)
            }
            None => {
                let mask = detector.generate_mask_bytes(&base_bytes)?;
                cache.store(zone_id, &mask, &detector.config().mask_strategy.to_string())?;
                log::info!("Cached new mask for zone {}", zone_id);
                Some(mask)
            }
        }
    } else {
        None
    };

    if let Some(path) = &cli.save_mask {
        let mask = match &zone {
            Some(mask) => mask.clone(),
            None => detector.generate_mask_bytes(&base_bytes)?,
        };
        let encoded = encode_png(&image::DynamicImage::ImageLuma8(mask))?;
        std::fs::write(path, &encoded.bytes)
            .with_context(|| format!("Failed to write mask to {}", path.display()))?;
        log::info!("Saved zone mask to {}", path.display());
    }

    let result = detector.detect_bytes(&base_bytes, &test_bytes, zone.as_ref())?;

    if let Some(path) = &cli.output {
        std::fs::write(path, &result.artifact.bytes)
            .with_context(|| format!("Failed to write result to {}", path.display()))?;
        log::info!("Saved result image to {}", path.display());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result.summary())?);
    } else {
        println!("Change Detected: {}", result.display_percentage());
        if result.exceeds_threshold {
            println!(
                "Change exceeds the alert threshold of {}",
                zonewatch::common::format_percentage(detector.config().alert_threshold)
            );
        }
    }

    if cli.notify {
        let triggers = AlertConfig::from_env().triggers();
        let failed = dispatch_alerts(&result, &triggers)
            .into_iter()
            .filter(|outcome| outcome.is_err())
            .count();
        if failed > 0 {
            log::error!("{} alert(s) could not be delivered", failed);
        }
    }

    Ok(())
}
