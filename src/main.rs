use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pitchtrack::{Config, DetectionCache, DetectionSource, Error, Frame, Pipeline, SourceKey};

#[derive(Parser, Debug)]
#[command(name = "pitchtrack", about = "Track players, teams and ball possession in a football clip")]
struct Args {
    /// Directory of decoded frames, read in file name order
    #[arg(long, value_name = "DIR")]
    frames: PathBuf,
    /// Raw detection cache recorded for these frames
    #[arg(long, value_name = "PATH")]
    detections: PathBuf,
    /// Clip identifier the cache was recorded under (defaults to the frames directory)
    #[arg(long)]
    source: Option<String>,
    /// JSON file overriding the default thresholds
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Where to write the analysis as JSON
    #[arg(long, value_name = "PATH")]
    output: PathBuf,
}

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn read_frames(dir: &Path) -> Result<Vec<Frame>, Error> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_frame = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if is_frame {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .iter()
        .enumerate()
        .map(|(idx, path)| -> Result<Frame, Error> {
            Ok(Frame::new(idx, image::open(path)?.to_rgb8()))
        })
        .collect()
}

fn write_output<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".part");
    let tmp = path.with_file_name(tmp_name);

    let written = (|| -> Result<(), Error> {
        let mut out = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut out, value)?;
        out.flush()?;
        Ok(())
    })();

    if let Err(err) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(err);
    }

    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let frames = read_frames(&args.frames)?;
    if frames.is_empty() {
        return Err(Error::EmptyInput);
    }
    info!("loaded {} frames from {}", frames.len(), args.frames.display());

    let source = args
        .source
        .clone()
        .unwrap_or_else(|| args.frames.display().to_string());
    let key = SourceKey::for_frames(source, &frames);
    let detections = DetectionCache::new(&args.detections).load(&key)?;

    let handle = Pipeline::new(config)?.spawn(frames, DetectionSource::Precomputed(detections))?;
    for pct in handle.progress() {
        info!("progress {}%", pct);
    }
    let analysis = handle.join()?;

    write_output(&args.output, &analysis)?;
    info!("wrote {}", args.output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_frames_are_read_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, width) in [("002.png", 3), ("000.png", 1), ("001.png", 2)] {
            RgbImage::new(width, 1).save(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let frames = read_frames(dir.path()).unwrap();

        let widths: Vec<u32> = frames.iter().map(|f| f.dims().0).collect();
        assert_eq!(widths, vec![1, 2, 3]);
        assert!(frames.iter().enumerate().all(|(i, f)| f.index == i));
    }

    #[test]
    fn test_unreadable_frame_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            read_frames(&dir.path().join("missing")),
            Err(Error::Io(_))
        ));
    }
}
