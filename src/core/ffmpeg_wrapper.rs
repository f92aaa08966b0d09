/// FFmpeg wrapper providing safe Rust interfaces around unsafe FFmpeg C bindings
///
/// This module encapsulates all unsafe FFmpeg operations and provides a safe API
/// for decoding a video file into RGB frames and encoding RGB frames back into
/// a video file. Both handles release every FFmpeg allocation in `Drop`, so an
/// early return or a panic mid-stream never leaks codec or file state.

use crate::models::video::{usable_frame_rate, VideoInfo};
use image::RgbImage;
use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Once;
use thiserror::Error;

// Import FFmpeg C bindings
use ffmpeg_sys_next::*;

#[derive(Error, Debug)]
pub enum FFmpegError {
    #[error("Path is not valid UTF-8 or contains NUL: {0}")]
    InvalidPath(PathBuf),
    #[error("Failed to open input: {0}")]
    InputOpenFailed(String),
    #[error("No video stream in input")]
    NoVideoStream,
    #[error("Failed to allocate codec context")]
    CodecContextAllocation,
    #[error("Codec not found: {0}")]
    CodecNotFound(String),
    #[error("Failed to open codec: {0}")]
    CodecOpenFailed(String),
    #[error("Failed to allocate frame")]
    FrameAllocation,
    #[error("Failed to allocate packet")]
    PacketAllocation,
    #[error("Failed to create output format context")]
    FormatContextCreation,
    #[error("Failed to create video stream")]
    StreamCreation,
    #[error("Failed to write header")]
    WriteHeaderFailed,
    #[error("Decoding error: {0}")]
    DecodingError(String),
    #[error("Encoding error: {0}")]
    EncodingError(String),
    #[error("Frame is {actual:?}, encoder expects {expected:?}")]
    FrameSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("Failed to initialize swscale context")]
    SwscaleInitFailed,
    #[error("Color conversion failed")]
    ColorConversionFailed,
}

pub type Result<T> = std::result::Result<T, FFmpegError>;

const SWS_BILINEAR_FLAG: i32 = 2;
const AV_TIME_BASE_F64: f64 = 1_000_000.0;

static LOG_LEVEL: Once = Once::new();

/// Keep libav* from printing per-frame chatter to stderr
fn quiet_ffmpeg_logs() {
    LOG_LEVEL.call_once(|| unsafe {
        av_log_set_level(AV_LOG_ERROR as i32);
    });
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    path.to_str()
        .and_then(|s| CString::new(s).ok())
        .ok_or_else(|| FFmpegError::InvalidPath(path.to_path_buf()))
}

fn rational_to_f64(value: AVRational) -> f64 {
    if value.den == 0 {
        0.0
    } else {
        value.num as f64 / value.den as f64
    }
}

// ==============================================================================
// Decoder
// ==============================================================================

/// Safe wrapper around an FFmpeg demuxer + video decoder.
///
/// Frames come out in presentation order as packed RGB24 at the stream's
/// initial dimensions.
pub struct FFmpegDecoder {
    format_context: *mut AVFormatContext,
    codec_context: *mut AVCodecContext,
    frame: *mut AVFrame,
    packet: *mut AVPacket,
    sws_context: *mut SwsContext,
    stream_index: i32,
    info: VideoInfo,
    draining: bool,
    finished: bool,
}

unsafe impl Send for FFmpegDecoder {}

impl FFmpegDecoder {
    /// Open a video file and prepare its best video stream for decoding
    pub fn open(input_path: &Path) -> Result<Self> {
        quiet_ffmpeg_logs();
        let input_path_c = path_to_cstring(input_path)?;

        let mut decoder = Self {
            format_context: ptr::null_mut(),
            codec_context: ptr::null_mut(),
            frame: ptr::null_mut(),
            packet: ptr::null_mut(),
            sws_context: ptr::null_mut(),
            stream_index: -1,
            info: VideoInfo {
                width: 0,
                height: 0,
                frame_rate: None,
                frame_count: 0,
            },
            draining: false,
            finished: false,
        };

        unsafe {
            // Open container; on failure FFmpeg frees the context itself
            let ret = avformat_open_input(
                &mut decoder.format_context,
                input_path_c.as_ptr(),
                ptr::null(),
                ptr::null_mut(),
            );
            if ret < 0 {
                decoder.format_context = ptr::null_mut();
                return Err(FFmpegError::InputOpenFailed(format!("Error code: {}", ret)));
            }

            let ret = avformat_find_stream_info(decoder.format_context, ptr::null_mut());
            if ret < 0 {
                return Err(FFmpegError::InputOpenFailed(format!(
                    "Could not read stream info, error code: {}",
                    ret
                )));
            }

            // Pick the best video stream and its decoder
            let mut codec: *const AVCodec = ptr::null();
            let stream_index = av_find_best_stream(
                decoder.format_context,
                AVMediaType::AVMEDIA_TYPE_VIDEO,
                -1,
                -1,
                &mut codec,
                0,
            );
            if stream_index < 0 {
                return Err(FFmpegError::NoVideoStream);
            }
            if codec.is_null() {
                return Err(FFmpegError::CodecNotFound("video decoder".to_string()));
            }
            decoder.stream_index = stream_index;

            let stream = *(*decoder.format_context)
                .streams
                .offset(stream_index as isize);

            decoder.codec_context = avcodec_alloc_context3(codec);
            if decoder.codec_context.is_null() {
                return Err(FFmpegError::CodecContextAllocation);
            }

            let ret = avcodec_parameters_to_context(decoder.codec_context, (*stream).codecpar);
            if ret < 0 {
                return Err(FFmpegError::CodecOpenFailed(format!(
                    "Could not copy stream parameters, error code: {}",
                    ret
                )));
            }

            let ret = avcodec_open2(decoder.codec_context, codec, ptr::null_mut());
            if ret < 0 {
                return Err(FFmpegError::CodecOpenFailed(format!("Error code: {}", ret)));
            }

            let width = (*decoder.codec_context).width;
            let height = (*decoder.codec_context).height;
            if width <= 0 || height <= 0 {
                return Err(FFmpegError::InputOpenFailed(format!(
                    "Invalid frame size {}x{}",
                    width, height
                )));
            }

            decoder.frame = av_frame_alloc();
            if decoder.frame.is_null() {
                return Err(FFmpegError::FrameAllocation);
            }

            decoder.packet = av_packet_alloc();
            if decoder.packet.is_null() {
                return Err(FFmpegError::PacketAllocation);
            }

            // Average rate first, the container's base rate as a fallback
            let frame_rate = usable_frame_rate(rational_to_f64((*stream).avg_frame_rate))
                .or_else(|| usable_frame_rate(rational_to_f64((*stream).r_frame_rate)));

            decoder.info = VideoInfo {
                width: width as u32,
                height: height as u32,
                frame_rate,
                frame_count: Self::expected_frame_count(decoder.format_context, stream, frame_rate),
            };
        }

        Ok(decoder)
    }

    /// Frame count from the container, or an estimate from the duration
    unsafe fn expected_frame_count(
        format_context: *mut AVFormatContext,
        stream: *mut AVStream,
        frame_rate: Option<f64>,
    ) -> u64 {
        if (*stream).nb_frames > 0 {
            return (*stream).nb_frames as u64;
        }

        let rate = match frame_rate {
            Some(rate) => rate,
            None => return 0,
        };

        let seconds = if (*stream).duration > 0 {
            (*stream).duration as f64 * rational_to_f64((*stream).time_base)
        } else if (*format_context).duration > 0 {
            (*format_context).duration as f64 / AV_TIME_BASE_F64
        } else {
            return 0;
        };

        (seconds * rate).round().max(0.0) as u64
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// Decode the next frame; `Ok(None)` once the stream is exhausted
    pub fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        unsafe {
            loop {
                if self.finished {
                    return Ok(None);
                }

                let ret = avcodec_receive_frame(self.codec_context, self.frame);
                if ret == 0 {
                    let converted = self.convert_frame();
                    av_frame_unref(self.frame);
                    return converted.map(Some);
                }

                if ret == AVERROR_EOF {
                    self.finished = true;
                    return Ok(None);
                }

                if ret != AVERROR(EAGAIN) {
                    return Err(FFmpegError::DecodingError(format!(
                        "Receive frame failed: {}",
                        ret
                    )));
                }

                if self.draining {
                    // Flushed decoder asked for more input; nothing left to give
                    self.finished = true;
                    return Ok(None);
                }

                self.feed_packet()?;
            }
        }
    }

    /// Send the next packet of our stream to the decoder, or start draining
    unsafe fn feed_packet(&mut self) -> Result<()> {
        loop {
            let ret = av_read_frame(self.format_context, self.packet);

            if ret == AVERROR_EOF {
                self.draining = true;
                let ret = avcodec_send_packet(self.codec_context, ptr::null());
                if ret < 0 && ret != AVERROR_EOF {
                    return Err(FFmpegError::DecodingError(format!(
                        "Failed to flush decoder: {}",
                        ret
                    )));
                }
                return Ok(());
            }

            if ret < 0 {
                return Err(FFmpegError::DecodingError(format!("Read packet failed: {}", ret)));
            }

            if (*self.packet).stream_index != self.stream_index {
                av_packet_unref(self.packet);
                continue;
            }

            let ret = avcodec_send_packet(self.codec_context, self.packet);
            av_packet_unref(self.packet);

            if ret < 0 && ret != AVERROR(EAGAIN) {
                return Err(FFmpegError::DecodingError(format!("Send packet failed: {}", ret)));
            }

            return Ok(());
        }
    }

    /// Convert the decoded frame to RGB24 at the stream's initial size
    unsafe fn convert_frame(&mut self) -> Result<RgbImage> {
        let width = self.info.width;
        let height = self.info.height;

        self.sws_context = sws_getCachedContext(
            self.sws_context,
            (*self.frame).width,
            (*self.frame).height,
            (*self.codec_context).pix_fmt,
            width as i32,
            height as i32,
            AVPixelFormat::AV_PIX_FMT_RGB24,
            SWS_BILINEAR_FLAG,
            ptr::null_mut(),
            ptr::null_mut(),
            ptr::null(),
        );

        if self.sws_context.is_null() {
            return Err(FFmpegError::SwscaleInitFailed);
        }

        let mut image = RgbImage::new(width, height);
        let dst_data = [
            image.as_mut_ptr(),
            ptr::null_mut(),
            ptr::null_mut(),
            ptr::null_mut(),
        ];
        let dst_linesize = [(width * 3) as i32, 0, 0, 0];

        let ret = sws_scale(
            self.sws_context,
            (*self.frame).data.as_ptr() as *const *const u8,
            (*self.frame).linesize.as_ptr(),
            0,
            (*self.frame).height,
            dst_data.as_ptr(),
            dst_linesize.as_ptr(),
        );

        if ret <= 0 {
            return Err(FFmpegError::ColorConversionFailed);
        }

        Ok(image)
    }
}

impl Drop for FFmpegDecoder {
    fn drop(&mut self) {
        unsafe {
            if !self.sws_context.is_null() {
                sws_freeContext(self.sws_context);
                self.sws_context = ptr::null_mut();
            }

            if !self.packet.is_null() {
                av_packet_free(&mut self.packet);
            }

            if !self.frame.is_null() {
                av_frame_free(&mut self.frame);
            }

            if !self.codec_context.is_null() {
                avcodec_free_context(&mut self.codec_context);
            }

            if !self.format_context.is_null() {
                avformat_close_input(&mut self.format_context);
            }
        }
    }
}

// ==============================================================================
// Encoder
// ==============================================================================

/// Safe wrapper around FFmpeg encoder
pub struct FFmpegEncoder {
    codec_context: *mut AVCodecContext,
    format_context: *mut AVFormatContext,
    video_stream: *mut AVStream,
    frame: *mut AVFrame,
    packet: *mut AVPacket,
    sws_context: *mut SwsContext,
    width: u32,
    height: u32,
    frame_count: i64,
    header_written: bool,
    finished: bool,
}

unsafe impl Send for FFmpegEncoder {}

impl FFmpegEncoder {
    /// Create a new encoder
    ///
    /// # Arguments
    /// * `output_path` - Output file; the container is picked from its extension
    /// * `width` - Video width in pixels
    /// * `height` - Video height in pixels
    /// * `fps` - Frames per second, may be fractional (e.g. 29.97)
    /// * `codec_name` - FFmpeg codec name (e.g., "libx264", "mpeg4")
    /// * `crf` - Constant Rate Factor for quality (lower = better quality)
    pub fn new(
        output_path: &Path,
        width: u32,
        height: u32,
        fps: f64,
        codec_name: &str,
        crf: u32,
    ) -> Result<Self> {
        quiet_ffmpeg_logs();
        let output_path_c = path_to_cstring(output_path)?;

        let mut encoder = Self {
            codec_context: ptr::null_mut(),
            format_context: ptr::null_mut(),
            video_stream: ptr::null_mut(),
            frame: ptr::null_mut(),
            packet: ptr::null_mut(),
            sws_context: ptr::null_mut(),
            width,
            height,
            frame_count: 0,
            header_written: false,
            finished: false,
        };

        unsafe {
            // Find codec
            let codec_name_c = CString::new(codec_name)
                .map_err(|_| FFmpegError::CodecNotFound(codec_name.to_string()))?;
            let codec = avcodec_find_encoder_by_name(codec_name_c.as_ptr());

            if codec.is_null() {
                return Err(FFmpegError::CodecNotFound(codec_name.to_string()));
            }

            // Create output format context
            let ret = avformat_alloc_output_context2(
                &mut encoder.format_context,
                ptr::null(),
                ptr::null(),
                output_path_c.as_ptr(),
            );
            if ret < 0 || encoder.format_context.is_null() || (*encoder.format_context).oformat.is_null() {
                return Err(FFmpegError::FormatContextCreation);
            }

            // Allocate codec context
            encoder.codec_context = avcodec_alloc_context3(codec);
            if encoder.codec_context.is_null() {
                return Err(FFmpegError::CodecContextAllocation);
            }

            // Rational rate keeps fractional sources like 29.97 exact enough
            let frame_rate = av_d2q(fps, 65535);
            if frame_rate.num <= 0 || frame_rate.den <= 0 {
                return Err(FFmpegError::CodecOpenFailed(format!("Invalid frame rate: {}", fps)));
            }

            let codec_context = encoder.codec_context;
            (*codec_context).width = width as i32;
            (*codec_context).height = height as i32;
            (*codec_context).time_base = AVRational {
                num: frame_rate.den,
                den: frame_rate.num,
            };
            (*codec_context).framerate = frame_rate;
            (*codec_context).pix_fmt = AVPixelFormat::AV_PIX_FMT_YUV420P;
            (*codec_context).gop_size = (fps.round() as i32).max(1) * 2; // Keyframe every 2 seconds
            (*codec_context).max_b_frames = 2;

            if ((*(*encoder.format_context).oformat).flags as u32 & AVFMT_GLOBALHEADER as u32) != 0 {
                (*codec_context).flags |= AV_CODEC_FLAG_GLOBAL_HEADER as i32;
            }

            if codec_name.contains("264") {
                // Set CRF for quality control (H.264 specific)
                let crf_key = CString::new("crf").map_err(|_| FFmpegError::CodecContextAllocation)?;
                let crf_str = CString::new(crf.to_string()).map_err(|_| FFmpegError::CodecContextAllocation)?;
                av_opt_set((*codec_context).priv_data, crf_key.as_ptr(), crf_str.as_ptr(), 0);

                // Set preset to "medium" for balance between speed and compression
                let preset_key = CString::new("preset").map_err(|_| FFmpegError::CodecContextAllocation)?;
                let preset_value = CString::new("medium").map_err(|_| FFmpegError::CodecContextAllocation)?;
                av_opt_set((*codec_context).priv_data, preset_key.as_ptr(), preset_value.as_ptr(), 0);
            } else {
                // Fixed quantizer for codecs without CRF
                let qscale = (crf / 6).clamp(2, 31) as i32;
                (*codec_context).flags |= AV_CODEC_FLAG_QSCALE as i32;
                (*codec_context).global_quality = FF_QP2LAMBDA as i32 * qscale;
                (*codec_context).max_b_frames = 0;
            }

            // Open codec
            let ret = avcodec_open2(codec_context, codec, ptr::null_mut());
            if ret < 0 {
                return Err(FFmpegError::CodecOpenFailed(format!("Error code: {}", ret)));
            }

            // Create video stream
            encoder.video_stream = avformat_new_stream(encoder.format_context, ptr::null());
            if encoder.video_stream.is_null() {
                return Err(FFmpegError::StreamCreation);
            }

            (*encoder.video_stream).time_base = (*codec_context).time_base;
            (*encoder.video_stream).avg_frame_rate = frame_rate;

            // Copy codec parameters to stream
            let ret = avcodec_parameters_from_context((*encoder.video_stream).codecpar, codec_context);
            if ret < 0 {
                return Err(FFmpegError::StreamCreation);
            }

            // Open output file, truncating any previous content
            if ((*(*encoder.format_context).oformat).flags as u32 & AVFMT_NOFILE as u32) == 0 {
                let ret = avio_open(
                    &mut (*encoder.format_context).pb,
                    output_path_c.as_ptr(),
                    AVIO_FLAG_WRITE as i32,
                );
                if ret < 0 {
                    return Err(FFmpegError::FormatContextCreation);
                }
            }

            // Allocate frame
            encoder.frame = av_frame_alloc();
            if encoder.frame.is_null() {
                return Err(FFmpegError::FrameAllocation);
            }

            (*encoder.frame).format = AVPixelFormat::AV_PIX_FMT_YUV420P as i32;
            (*encoder.frame).width = width as i32;
            (*encoder.frame).height = height as i32;

            let ret = av_frame_get_buffer(encoder.frame, 0);
            if ret < 0 {
                return Err(FFmpegError::FrameAllocation);
            }

            // Allocate packet
            encoder.packet = av_packet_alloc();
            if encoder.packet.is_null() {
                return Err(FFmpegError::PacketAllocation);
            }

            // Initialize swscale context for RGB24 -> YUV420P conversion
            encoder.sws_context = sws_getContext(
                width as i32,
                height as i32,
                AVPixelFormat::AV_PIX_FMT_RGB24,
                width as i32,
                height as i32,
                AVPixelFormat::AV_PIX_FMT_YUV420P,
                SWS_BILINEAR_FLAG,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null(),
            );

            if encoder.sws_context.is_null() {
                return Err(FFmpegError::SwscaleInitFailed);
            }

            // Write file header last so a written header implies a usable encoder
            let ret = avformat_write_header(encoder.format_context, ptr::null_mut());
            if ret < 0 {
                return Err(FFmpegError::WriteHeaderFailed);
            }
            encoder.header_written = true;
        }

        Ok(encoder)
    }

    pub fn frames_encoded(&self) -> i64 {
        self.frame_count
    }

    /// Encode a single frame
    pub fn encode_frame(&mut self, image: &RgbImage) -> Result<()> {
        if image.dimensions() != (self.width, self.height) {
            return Err(FFmpegError::FrameSizeMismatch {
                expected: (self.width, self.height),
                actual: image.dimensions(),
            });
        }

        unsafe {
            // Make frame writable
            let ret = av_frame_make_writable(self.frame);
            if ret < 0 {
                return Err(FFmpegError::EncodingError("Failed to make frame writable".to_string()));
            }

            // Convert RGB24 to YUV420P
            let src_data = [
                image.as_ptr(),
                ptr::null(),
                ptr::null(),
                ptr::null(),
            ];
            let src_linesize = [
                (self.width * 3) as i32, // RGB24 has 3 bytes per pixel
                0,
                0,
                0,
            ];

            let ret = sws_scale(
                self.sws_context,
                src_data.as_ptr(),
                src_linesize.as_ptr(),
                0,
                self.height as i32,
                (*self.frame).data.as_ptr() as *const *mut u8,
                (*self.frame).linesize.as_ptr(),
            );

            if ret < 0 {
                return Err(FFmpegError::ColorConversionFailed);
            }

            // Set frame PTS (presentation timestamp)
            (*self.frame).pts = self.frame_count;
            self.frame_count += 1;

            // Send frame to encoder
            let ret = avcodec_send_frame(self.codec_context, self.frame);
            if ret < 0 {
                return Err(FFmpegError::EncodingError(format!("Send frame failed: {}", ret)));
            }

            // Receive encoded packets
            self.receive_packets()?;

            Ok(())
        }
    }

    /// Receive and write encoded packets
    fn receive_packets(&mut self) -> Result<()> {
        unsafe {
            loop {
                let ret = avcodec_receive_packet(self.codec_context, self.packet);

                if ret == AVERROR(EAGAIN) || ret == AVERROR_EOF {
                    break; // Need more frames or encoding is done
                }

                if ret < 0 {
                    return Err(FFmpegError::EncodingError(format!("Receive packet failed: {}", ret)));
                }

                // Rescale packet timestamps
                av_packet_rescale_ts(
                    self.packet,
                    (*self.codec_context).time_base,
                    (*self.video_stream).time_base,
                );
                (*self.packet).stream_index = (*self.video_stream).index;

                // Write packet
                let ret = av_interleaved_write_frame(self.format_context, self.packet);

                av_packet_unref(self.packet);

                if ret < 0 {
                    return Err(FFmpegError::EncodingError(format!("Write frame failed: {}", ret)));
                }
            }
            Ok(())
        }
    }

    /// Flush encoder and write trailer. Safe to call more than once.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished || !self.header_written {
            return Ok(());
        }
        self.finished = true;

        unsafe {
            // Flush encoder
            let ret = avcodec_send_frame(self.codec_context, ptr::null());
            if ret < 0 {
                return Err(FFmpegError::EncodingError("Failed to flush encoder".to_string()));
            }

            // Receive remaining packets
            self.receive_packets()?;

            // Write trailer
            let ret = av_write_trailer(self.format_context);
            if ret < 0 {
                return Err(FFmpegError::EncodingError("Failed to write trailer".to_string()));
            }

            Ok(())
        }
    }
}

impl Drop for FFmpegEncoder {
    fn drop(&mut self) {
        // Leave a playable file behind even when the caller bailed out early
        if let Err(e) = self.finish() {
            tracing::warn!("Failed to finalize video output: {}", e);
        }

        unsafe {
            // Clean up resources in reverse order
            if !self.sws_context.is_null() {
                sws_freeContext(self.sws_context);
                self.sws_context = ptr::null_mut();
            }

            if !self.packet.is_null() {
                av_packet_free(&mut self.packet);
            }

            if !self.frame.is_null() {
                av_frame_free(&mut self.frame);
            }

            if !self.format_context.is_null() {
                if !(*self.format_context).pb.is_null() {
                    avio_closep(&mut (*self.format_context).pb);
                }
                avformat_free_context(self.format_context);
                self.format_context = ptr::null_mut();
            }

            if !self.codec_context.is_null() {
                avcodec_free_context(&mut self.codec_context);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid_frame(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    fn write_test_video(path: &Path, frames: usize, fps: f64) -> i64 {
        let mut encoder = FFmpegEncoder::new(path, 64, 48, fps, "mpeg4", 25).unwrap();
        for i in 0..frames {
            let shade = (i * 20).min(255) as u8;
            encoder.encode_frame(&solid_frame(64, 48, [shade, 0, 255 - shade])).unwrap();
        }
        encoder.finish().unwrap();
        encoder.frames_encoded()
    }

    #[test]
    fn test_encoder_creation() {
        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("test_video.mp4");

        let result = FFmpegEncoder::new(&output_path, 640, 480, 30.0, "mpeg4", 23);

        assert!(result.is_ok());
    }

    #[test]
    fn test_unknown_codec_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("test_video.mp4");

        let result = FFmpegEncoder::new(&output_path, 64, 48, 30.0, "not_a_codec", 23);
        assert!(matches!(result, Err(FFmpegError::CodecNotFound(_))));
    }

    #[test]
    fn test_frame_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("test_video.mp4");

        let mut encoder = FFmpegEncoder::new(&output_path, 64, 48, 30.0, "mpeg4", 23).unwrap();
        let result = encoder.encode_frame(&solid_frame(32, 32, [0, 0, 0]));
        assert!(matches!(result, Err(FFmpegError::FrameSizeMismatch { .. })));
    }

    #[test]
    fn test_decode_what_was_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.mp4");
        assert_eq!(write_test_video(&path, 12, 12.0), 12);

        let mut decoder = FFmpegDecoder::open(&path).unwrap();
        let info = decoder.info().clone();
        assert_eq!((info.width, info.height), (64, 48));
        let rate = info.frame_rate.unwrap();
        assert!((rate - 12.0).abs() < 1e-3, "unexpected rate {}", rate);

        let mut decoded = 0;
        while let Some(frame) = decoder.next_frame().unwrap() {
            assert_eq!(frame.dimensions(), (64, 48));
            decoded += 1;
        }
        assert_eq!(decoded, 12);
        assert_eq!(info.frame_count, 12);

        // Exhausted decoders stay exhausted
        assert!(decoder.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_open_garbage_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.mp4");
        std::fs::write(&path, b"definitely not a video container").unwrap();

        assert!(FFmpegDecoder::open(&path).is_err());
    }
}
