//! Upscaler modes and output-resolution presets
//!
//! This module provides the user-facing selectors for the upscale pipeline: which
//! kernel chain runs, and common output-resolution scale factors.

use crate::KernelRole;
use std::fmt;
use std::str::FromStr;

/// Kernel chain used to produce the output image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineMode {
    /// Edge-adaptive upsample followed by an in-place contrast-adaptive sharpen
    #[default]
    TwoPassSharpened,
    /// Single bilinear upsample
    SinglePassSmoothed,
}

impl PipelineMode {
    /// Returns the human-readable name of this mode
    pub fn name(&self) -> &'static str {
        match self {
            PipelineMode::TwoPassSharpened => "FSR (EASU + RCAS)",
            PipelineMode::SinglePassSmoothed => "Bilinear",
        }
    }

    /// Kernels executed by this mode, in execution order
    pub fn kernels(&self) -> &'static [KernelRole] {
        match self {
            PipelineMode::TwoPassSharpened => &[KernelRole::EdgeAdaptiveUpsample, KernelRole::Sharpen],
            PipelineMode::SinglePassSmoothed => &[KernelRole::BilinearUpsample],
        }
    }

    /// Returns the other mode
    pub fn toggled(&self) -> Self {
        match self {
            PipelineMode::TwoPassSharpened => PipelineMode::SinglePassSmoothed,
            PipelineMode::SinglePassSmoothed => PipelineMode::TwoPassSharpened,
        }
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown mode or preset name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParsePresetError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl FromStr for PipelineMode {
    type Err = ParsePresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fsr" | "sharpened" | "easu" => Ok(PipelineMode::TwoPassSharpened),
            "bilinear" | "smoothed" => Ok(PipelineMode::SinglePassSmoothed),
            _ => Err(ParsePresetError {
                kind: "mode",
                value: s.to_string(),
                expected: "fsr, bilinear",
            }),
        }
    }
}

/// Output-resolution presets, expressed as a per-axis scale of the input extent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalePreset {
    /// 1.3x per axis
    UltraQuality,
    /// 1.5x per axis
    Quality,
    /// 1.7x per axis
    Balanced,
    /// 2x per axis
    Performance,
    /// 4x per axis
    Ultra,
}

impl ScalePreset {
    /// All presets from smallest to largest scale
    pub const ALL: [ScalePreset; 5] = [
        ScalePreset::UltraQuality,
        ScalePreset::Quality,
        ScalePreset::Balanced,
        ScalePreset::Performance,
        ScalePreset::Ultra,
    ];

    /// Returns the human-readable name of this preset
    pub fn name(&self) -> &'static str {
        match self {
            ScalePreset::UltraQuality => "Ultra Quality",
            ScalePreset::Quality => "Quality",
            ScalePreset::Balanced => "Balanced",
            ScalePreset::Performance => "Performance",
            ScalePreset::Ultra => "Ultra",
        }
    }

    /// Per-axis scale factor applied to the input extent
    pub fn scale_factor(&self) -> f64 {
        match self {
            ScalePreset::UltraQuality => 1.3,
            ScalePreset::Quality => 1.5,
            ScalePreset::Balanced => 1.7,
            ScalePreset::Performance => 2.0,
            ScalePreset::Ultra => 4.0,
        }
    }
}

impl FromStr for ScalePreset {
    type Err = ParsePresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "ultraquality" => Ok(ScalePreset::UltraQuality),
            "quality" => Ok(ScalePreset::Quality),
            "balanced" => Ok(ScalePreset::Balanced),
            "performance" => Ok(ScalePreset::Performance),
            "ultra" => Ok(ScalePreset::Ultra),
            _ => Err(ParsePresetError {
                kind: "preset",
                value: s.to_string(),
                expected: "ultra-quality, quality, balanced, performance, ultra",
            }),
        }
    }
}
