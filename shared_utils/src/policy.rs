//! Compression Policy Module
//!
//! Named, immutable parameter sets for both tools:
//! - `ImagePolicy`: width cap, JPEG quality, PNG optimisation
//! - `VideoPolicy`: x264 CRF, speed preset, AAC bitrate, faststart layout
//!
//! Values are fixed for the duration of a run and validated once at startup.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// x264/H.264 Constants
// ============================================================================

/// x264 minimum CRF (lossless)
pub const X264_CRF_MIN: u8 = 0;

/// x264 maximum CRF (lowest quality)
pub const X264_CRF_MAX: u8 = 51;

/// CRF used by the stock compression profile
pub const X264_CRF_COMPRESS: u8 = 28;

/// AAC bitrate (kbps) used by the stock compression profile
pub const AUDIO_BITRATE_KBPS_DEFAULT: u32 = 128;

pub const VIDEO_CODEC: &str = "libx264";
pub const AUDIO_CODEC: &str = "aac";

// ============================================================================
// Validation
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("max width must be greater than 0")]
    ZeroWidth,

    #[error("JPEG quality must be within 1..=100, got {0}")]
    JpegQualityOutOfRange(u8),

    #[error("CRF must be within {min}..={max}, got {value}")]
    CrfOutOfRange { value: u8, min: u8, max: u8 },

    #[error("audio bitrate must be greater than 0 kbps")]
    ZeroAudioBitrate,

    #[error("unknown encoder preset: {0}")]
    UnknownPreset(String),
}

// ============================================================================
// Image policy
// ============================================================================

/// Resize/re-encode parameters for the image pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePolicy {
    /// Images wider than this are downscaled to exactly this width.
    pub max_width: u32,
    /// JPEG quality factor (1-100).
    pub jpeg_quality: u8,
    /// Best PNG compression with adaptive filtering.
    pub png_optimize: bool,
}

impl ImagePolicy {
    /// Web-friendly default: 1200 px wide, quality 82.
    pub const STANDARD: ImagePolicy = ImagePolicy {
        max_width: 1200,
        jpeg_quality: 82,
        png_optimize: true,
    };

    /// Aggressive variant: 900 px wide, quality 60.
    pub const ULTRA: ImagePolicy = ImagePolicy {
        max_width: 900,
        jpeg_quality: 60,
        png_optimize: true,
    };

    pub fn standard() -> Self {
        Self::STANDARD
    }

    pub fn ultra() -> Self {
        Self::ULTRA
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.max_width == 0 {
            return Err(PolicyError::ZeroWidth);
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(PolicyError::JpegQualityOutOfRange(self.jpeg_quality));
        }
        Ok(())
    }
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl fmt::Display for ImagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max width {}px, JPEG quality {}, PNG optimize {}",
            self.max_width,
            self.jpeg_quality,
            if self.png_optimize { "on" } else { "off" }
        )
    }
}

// ============================================================================
// Video policy
// ============================================================================

/// x264 speed/efficiency preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncoderPreset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    #[default]
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl EncoderPreset {
    pub const ALL: [EncoderPreset; 9] = [
        EncoderPreset::Ultrafast,
        EncoderPreset::Superfast,
        EncoderPreset::Veryfast,
        EncoderPreset::Faster,
        EncoderPreset::Fast,
        EncoderPreset::Medium,
        EncoderPreset::Slow,
        EncoderPreset::Slower,
        EncoderPreset::Veryslow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EncoderPreset::Ultrafast => "ultrafast",
            EncoderPreset::Superfast => "superfast",
            EncoderPreset::Veryfast => "veryfast",
            EncoderPreset::Faster => "faster",
            EncoderPreset::Fast => "fast",
            EncoderPreset::Medium => "medium",
            EncoderPreset::Slow => "slow",
            EncoderPreset::Slower => "slower",
            EncoderPreset::Veryslow => "veryslow",
        }
    }
}

impl fmt::Display for EncoderPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncoderPreset {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| PolicyError::UnknownPreset(s.to_string()))
    }
}

/// Fixed re-encode profile for the video pipeline (H.264 + AAC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoPolicy {
    pub crf: u8,
    pub preset: EncoderPreset,
    pub audio_bitrate_kbps: u32,
    /// Relocate the moov atom to the head of the file.
    pub faststart: bool,
}

impl VideoPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.crf > X264_CRF_MAX {
            return Err(PolicyError::CrfOutOfRange {
                value: self.crf,
                min: X264_CRF_MIN,
                max: X264_CRF_MAX,
            });
        }
        if self.audio_bitrate_kbps == 0 {
            return Err(PolicyError::ZeroAudioBitrate);
        }
        Ok(())
    }

    /// Bitrate argument in ffmpeg notation, e.g. `128k`.
    pub fn audio_bitrate_arg(&self) -> String {
        format!("{}k", self.audio_bitrate_kbps)
    }
}

impl Default for VideoPolicy {
    fn default() -> Self {
        Self {
            crf: X264_CRF_COMPRESS,
            preset: EncoderPreset::Medium,
            audio_bitrate_kbps: AUDIO_BITRATE_KBPS_DEFAULT,
            faststart: true,
        }
    }
}

impl fmt::Display for VideoPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} CRF {} preset {}, {} {}",
            VIDEO_CODEC,
            self.crf,
            self.preset,
            AUDIO_CODEC,
            self.audio_bitrate_arg()
        )?;
        if self.faststart {
            write!(f, ", faststart")?;
        }
        Ok(())
    }
}
