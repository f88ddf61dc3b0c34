//! Colour profile handle produced by the synthesizer.
//!
//! This is a thin wrapper around `moxcms::ColorProfile` which remembers where
//! the profile came from, so a colour-management layer can tell an embedded
//! profile from a built-in or computed one.

use crate::colorimetry::{D50_XYZ, RgbColorimetry, bradford_adaptation};
use crate::error::{MetadataError, Result};

/// Provenance of a [`ColorProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    /// Parsed from an ICC profile embedded in the image.
    Embedded,
    /// The built-in sRGB profile.
    BuiltinSrgb,
    /// Computed from whitepoint, primaries and gamma.
    Synthesized,
}

#[derive(Debug, Clone)]
pub struct ColorProfile {
    inner: moxcms::ColorProfile,
    source: ProfileSource,
    colorimetry: Option<RgbColorimetry>,
}

impl ColorProfile {
    /// Create a profile from raw ICC data
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let inner = moxcms::ColorProfile::new_from_slice(data)
            .map_err(|e| MetadataError::ProfileParse(format!("{:?}", e)))?;
        Ok(Self {
            inner,
            source: ProfileSource::Embedded,
            colorimetry: None,
        })
    }

    /// Create the built-in sRGB profile
    pub fn new_srgb() -> Self {
        Self {
            inner: moxcms::ColorProfile::new_srgb(),
            source: ProfileSource::BuiltinSrgb,
            colorimetry: Some(RgbColorimetry::SRGB),
        }
    }

    /// Build an RGB display profile from chromaticities and a gamma value.
    ///
    /// The colorants are Bradford-adapted to D50 and all three channels get
    /// the same power-law curve.
    pub fn from_colorimetry(colorimetry: RgbColorimetry) -> Result<Self> {
        colorimetry.validate()?;
        let colorants = colorimetry.colorants_d50()?;
        let adaptation = bradford_adaptation(colorimetry.white_point.to_xyz()?, D50_XYZ)
            .ok_or(MetadataError::InvalidChromaticity)?;

        let column = |i: usize| moxcms::Xyzd {
            x: colorants[0][i],
            y: colorants[1][i],
            z: colorants[2][i],
        };

        // Start from the built-in RGB display profile and replace its
        // colorimetry.
        let mut inner = moxcms::ColorProfile::new_srgb();
        inner.red_colorant = column(0);
        inner.green_colorant = column(1);
        inner.blue_colorant = column(2);
        inner.white_point = moxcms::Xyzd {
            x: D50_XYZ[0],
            y: D50_XYZ[1],
            z: D50_XYZ[2],
        };
        let curve = moxcms::curve_from_gamma(colorimetry.gamma as f32);
        inner.red_trc = Some(curve.clone());
        inner.green_trc = Some(curve.clone());
        inner.blue_trc = Some(curve);
        inner.chromatic_adaptation = Some(moxcms::Matrix3d { v: adaptation });
        inner.cicp = None;
        inner.description = None;

        Ok(Self {
            inner,
            source: ProfileSource::Synthesized,
            colorimetry: Some(colorimetry),
        })
    }

    pub fn source(&self) -> ProfileSource {
        self.source
    }

    pub fn is_builtin_srgb(&self) -> bool {
        self.source == ProfileSource::BuiltinSrgb
    }

    /// The chromaticities and gamma the profile was built from, if it was
    /// not parsed from ICC data.
    pub fn colorimetry(&self) -> Option<&RgbColorimetry> {
        self.colorimetry.as_ref()
    }

    /// Check if this is an RGB profile
    pub fn is_rgb(&self) -> bool {
        matches!(self.inner.color_space, moxcms::DataColorSpace::Rgb)
    }

    /// Get description text if available
    pub fn description(&self) -> Option<String> {
        self.inner.description.as_ref().map(|text| match text {
            moxcms::ProfileText::PlainString(s) => s.clone(),
            moxcms::ProfileText::Localizable(locs) => {
                locs.first().map(|l| l.value.clone()).unwrap_or_default()
            }
            moxcms::ProfileText::Description(desc) => desc.ascii_string.clone(),
        })
    }

    /// Access the inner moxcms profile
    pub fn inner(&self) -> &moxcms::ColorProfile {
        &self.inner
    }

    pub fn into_inner(self) -> moxcms::ColorProfile {
        self.inner
    }
}

impl AsRef<moxcms::ColorProfile> for ColorProfile {
    fn as_ref(&self) -> &moxcms::ColorProfile {
        &self.inner
    }
}
