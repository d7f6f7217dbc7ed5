use clap::{Parser, Subcommand};
use hairstyle_studio::archive::ArchiveBuilder;
use hairstyle_studio::config::{self, FailurePolicy, StudioConfig};
use hairstyle_studio::download::{DirectorySink, DownloadSink};
use hairstyle_studio::export::SingleAssetExporter;
use hairstyle_studio::fetch::HttpFetcher;
use hairstyle_studio::generation::HttpStyleGenerator;
use hairstyle_studio::imaging::{ImageBackend, RustBackend};
use hairstyle_studio::intake::{Candidate, ImageIntake};
use hairstyle_studio::session::Session;
use hairstyle_studio::types::{FaceShape, HairLength, LookCollection};
use hairstyle_studio::{logging, output};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "hairstyle-studio")]
#[command(about = "Try hairstyles on a portrait and download the looks")]
#[command(long_about = "\
Try hairstyles on a portrait and download the looks

Upload a portrait, pick a face shape and hair length, and the generation
service answers with two galleries of looks: natural & everyday, and
glamorous & evening. Looks can be saved one at a time or all together as a
zip archive with one folder per gallery.

Typical session:

  hairstyle-studio check portrait.jpg
  hairstyle-studio generate portrait.jpg --face-shape heart --hair-length long \\
      --consent --out looks.json
  hairstyle-studio list looks.json
  hairstyle-studio export looks.json n1 --output saved/
  hairstyle-studio archive looks.json --output saved/

Portraits of at least 800x1000px give the best results.

Run 'hairstyle-studio gen-config' to generate a documented studio.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding studio.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run portraits through the upload checks and show advisories
    Check {
        /// Images to check; each one replaces the previous upload
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Send a portrait to the generation service and save the looks
    Generate {
        image: PathBuf,
        #[arg(long, default_value_t = FaceShape::default())]
        face_shape: FaceShape,
        #[arg(long, default_value_t = HairLength::default())]
        hair_length: HairLength,
        /// Confirm you have the right to use this photo
        #[arg(long)]
        consent: bool,
        /// Write the looks JSON here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Download every look into one zip archive
    Archive {
        looks: PathBuf,
        #[arg(long, default_value = ".")]
        output: PathBuf,
        /// Leave out looks that fail to download instead of failing the archive
        #[arg(long)]
        skip_failed: bool,
    },
    /// Download a single look
    Export {
        looks: PathBuf,
        look_id: String,
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
    /// Show both galleries with the filenames looks are saved under
    List { looks: PathBuf },
    /// Print a stock studio.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // gen-config must work even when the existing studio.toml is broken.
    let config = match cli.command {
        Command::GenConfig => StudioConfig::default(),
        _ => config::load_config(&cli.config_dir)?,
    };
    logging::init_logging(&config.logging.level);

    match cli.command {
        Command::Check { images } => {
            let mut intake = new_intake(&config);
            for path in &images {
                let candidate = load_candidate(path)?;
                let name = candidate.name.clone();
                match intake.accept_and_measure(Some(candidate)).await {
                    Ok(upload) => output::print_check(upload),
                    Err(reason) => output::print_rejection(&name, &reason),
                }
            }
        }
        Command::Generate {
            image,
            face_shape,
            hair_length,
            consent,
            out,
        } => {
            let generator = HttpStyleGenerator::new(&config.generation, &config.fetch)?;
            let mut session = Session::new(new_intake(&config));
            let candidate = load_candidate(&image)?;
            let name = candidate.name.clone();
            let intake = session.intake_mut();
            match intake.accept_and_measure(Some(candidate)).await {
                Ok(upload) => output::print_check(upload),
                Err(reason) => {
                    output::print_rejection(&name, &reason);
                    return Err(format!("{name} cannot be used").into());
                }
            }
            intake.set_face_shape(face_shape);
            intake.set_hair_length(hair_length);
            intake.set_consent(consent);

            let collection = session.generate(&generator).await?;
            let json = serde_json::to_string_pretty(&*collection)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    output::print_gallery(&collection);
                    println!("==> Looks saved to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Archive {
            looks,
            output: dir,
            skip_failed,
        } => {
            let collection = read_looks(&looks)?;
            let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
            let mut archive_config = config.archive.clone();
            if skip_failed {
                archive_config.failure_policy = FailurePolicy::SkipFailed;
            }
            let builder = ArchiveBuilder::new(fetcher.clone(), archive_config);
            let archive = builder.build_archive(&collection).await?;
            output::print_archive(&archive);

            let sink = DirectorySink::new(dir, fetcher);
            sink.trigger_bytes(&archive.filename, archive.bytes);
            finish_downloads(&sink).await?;
        }
        Command::Export {
            looks,
            look_id,
            output: dir,
        } => {
            let collection = read_looks(&looks)?;
            let (_, look) = collection
                .find(&look_id)
                .ok_or_else(|| format!("no look with id '{look_id}' in {}", looks.display()))?;
            let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
            let sink = Arc::new(DirectorySink::new(dir, fetcher));
            SingleAssetExporter::new(sink.clone()).export_one(look);
            finish_downloads(&sink).await?;
        }
        Command::List { looks } => {
            output::print_gallery(&read_looks(&looks)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn new_intake(config: &StudioConfig) -> ImageIntake {
    ImageIntake::new(Arc::new(RustBackend::new()), config.intake.clone())
}

/// Read an image from disk. Files whose extension says nothing about their
/// type are declared by content instead.
fn load_candidate(path: &Path) -> std::io::Result<Candidate> {
    let mut candidate = Candidate::from_path(path)?;
    if candidate.media_type.is_none() {
        candidate.media_type = RustBackend::new()
            .sniff_media_type(&candidate.bytes)
            .map(str::to_string);
    }
    Ok(candidate)
}

fn read_looks(path: &Path) -> Result<LookCollection, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    Ok(LookCollection::from_json(&json)?)
}

/// Wait for the sink, print what happened, and fail if any save failed.
async fn finish_downloads(sink: &DirectorySink) -> Result<(), Box<dyn std::error::Error>> {
    let reports = sink.wait_idle().await;
    output::print_downloads(&reports);
    let failed = reports.iter().filter(|r| r.result.is_err()).count();
    if failed > 0 {
        return Err(format!("{failed} download(s) failed").into());
    }
    Ok(())
}
