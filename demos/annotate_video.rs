/// Annotate a synthetic dance clip end to end
///
/// This example renders a short clip with a moving marker, runs it through the
/// annotation pipeline with the compiled-in pose backend, and prints the
/// resulting metrics.
///
/// Run with: cargo run --example annotate_video
/// With MediaPipe: cargo run --example annotate_video --features ml-pyo3

use dance_analyzer_lib::core::ffmpeg_wrapper::FFmpegEncoder;
use dance_analyzer_lib::{AnalyzerConfig, DefaultPoseBackend, VideoAnnotator};
use image::{Rgb, RgbImage};
use std::path::Path;
use std::sync::Arc;

fn create_marker_frame(width: u32, height: u32, index: u32) -> RgbImage {
    let mut frame = RgbImage::from_pixel(width, height, Rgb([30, 30, 30]));
    let left = (10 + index * 8).min(width - 20);

    for y in 50..70 {
        for x in left..left + 20 {
            frame.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }

    frame
}

fn write_synthetic_clip(path: &Path, frames: u32, fps: f64) -> Result<(), Box<dyn std::error::Error>> {
    let (width, height) = (160, 120);
    let mut encoder = FFmpegEncoder::new(path, width, height, fps, "mpeg4", 25)?;

    for i in 0..frames {
        encoder.encode_frame(&create_marker_frame(width, height, i))?;
    }
    encoder.finish()?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Dance Annotation Demo ===\n");

    let output_dir = std::env::temp_dir().join("dance_analyzer_demo");
    std::fs::create_dir_all(&output_dir)?;
    let input_path = output_dir.join("synthetic_input.mp4");
    let output_path = output_dir.join("annotated.mp4");

    println!("Writing 15-frame synthetic clip to {:?}", input_path);
    write_synthetic_clip(&input_path, 15, 10.0)?;

    let config = AnalyzerConfig {
        video_codec: "mpeg4".to_string(),
        ..AnalyzerConfig::default()
    };
    let annotator = VideoAnnotator::new(Arc::new(DefaultPoseBackend::default()), config);

    match annotator
        .process_async(input_path.clone(), output_path.clone(), Some(10.0), None)
        .await
    {
        Ok(result) => {
            println!("✓ Annotation successful!");
            println!("  - Frames written: {}", result.frames_written);
            println!("  - Output FPS: {}", result.output_frame_rate);
            println!("  - Frames with pose: {}", result.metrics.frames_with_pose);
            println!("  - Avg movement intensity: {}", result.metrics.avg_movement_intensity);
            println!(
                "  - Dominant limb: {}",
                result.metrics.dominant_limb.map(|l| l.as_str()).unwrap_or("none")
            );
            println!("  - Output: {:?}", output_path);
            println!("\n{}", serde_json::to_string_pretty(&result.metrics)?);
        }
        Err(e) => {
            println!("✗ Annotation failed: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
