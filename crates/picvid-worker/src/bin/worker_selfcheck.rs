use std::path::Path;

use picvid_media::{check_ffmpeg, check_ffprobe, write_frame, FrameProducer, LetterboxNormalizer};
use picvid_models::Resolution;
use picvid_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_workdir(&config.work_dir).await?;

    let ffmpeg = check_ffmpeg()?;
    println!("worker-selfcheck: ffmpeg at {}", ffmpeg.display());
    match check_ffprobe() {
        Ok(path) => println!("worker-selfcheck: ffprobe at {}", path.display()),
        Err(e) => println!("worker-selfcheck: {} (output verification disabled)", e),
    }

    render_test_frame(&config.work_dir)?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

/// Letterbox a tiny image and write it where jobs write their frames.
fn render_test_frame(work_dir: &Path) -> anyhow::Result<()> {
    let mut raw = std::io::Cursor::new(Vec::new());
    image::RgbImage::from_pixel(4, 3, image::Rgb([200, 30, 30]))
        .write_to(&mut raw, image::ImageFormat::Png)?;

    let target = Resolution::Square.frame_size();
    let frame = LetterboxNormalizer::new().produce(raw.get_ref(), target)?;

    let path = work_dir.join("selfcheck_frame.png");
    write_frame(&frame, &path)?;
    std::fs::remove_file(&path)?;

    println!("worker-selfcheck: rendered {} test frame", target);
    Ok(())
}
