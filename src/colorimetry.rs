//! RGB colorimetry from chromaticity coordinates.
//!
//! Turns a whitepoint and three primaries given as CIE xy coordinates into
//! the D50-adapted colorant matrix an ICC matrix/TRC profile carries.
//!
//! References:
//! - ICC.1:2022 Annex E (Bradford adaptation)
//! - Lindbloom: http://www.brucelindbloom.com/index.html?Eqn_RGB_XYZ_Matrix.html

use crate::error::{MetadataError, Result};

pub type Matrix3 = [[f64; 3]; 3];

/// Bradford matrix: XYZ → LMS (cone response)
const BRADFORD_XYZ_TO_LMS: Matrix3 = [
    [0.8951000, 0.2664000, -0.1614000],
    [-0.7502000, 1.7135000, 0.0367000],
    [0.0389000, -0.0685000, 1.0296000],
];

/// Bradford matrix: LMS → XYZ (inverse)
const BRADFORD_LMS_TO_XYZ: Matrix3 = [
    [0.9869929, -0.1470543, 0.1599627],
    [0.4323053, 0.5183603, 0.0492912],
    [-0.0085287, 0.0400428, 0.9684867],
];

/// ICC profile connection space illuminant.
pub const D50_XYZ: [f64; 3] = [0.9642, 1.0, 0.8249];

/// CIE xy chromaticity, luminance implied as 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chromaticity {
    pub x: f64,
    pub y: f64,
}

impl Chromaticity {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// xyY (Y = 1) to XYZ.
    pub fn to_xyz(self) -> Result<[f64; 3]> {
        if !self.x.is_finite() || !self.y.is_finite() || self.y <= 0.0 {
            return Err(MetadataError::InvalidChromaticity);
        }
        Ok([self.x / self.y, 1.0, (1.0 - self.x - self.y) / self.y])
    }

    fn approx_eq(self, other: Self, epsilon: f64) -> bool {
        (self.x - other.x).abs() < epsilon && (self.y - other.y).abs() < epsilon
    }
}

/// Whitepoint, primaries and a single power-law gamma shared by all three
/// channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColorimetry {
    pub white_point: Chromaticity,
    pub red: Chromaticity,
    pub green: Chromaticity,
    pub blue: Chromaticity,
    pub gamma: f64,
}

const CHROMATICITY_EPSILON: f64 = 1e-4;
const GAMMA_EPSILON: f64 = 1e-3;

impl RgbColorimetry {
    /// sRGB / BT.709 primaries with a D65 whitepoint and the 2.2 gamma
    /// approximation PNG and EXIF use.
    pub const SRGB: Self = Self {
        white_point: Chromaticity::new(0.3127, 0.3290),
        red: Chromaticity::new(0.64, 0.33),
        green: Chromaticity::new(0.30, 0.60),
        blue: Chromaticity::new(0.15, 0.06),
        gamma: 2.2,
    };

    /// True when every value is within a small epsilon of [`Self::SRGB`].
    pub fn matches_srgb(&self) -> bool {
        let srgb = Self::SRGB;
        self.white_point.approx_eq(srgb.white_point, CHROMATICITY_EPSILON)
            && self.red.approx_eq(srgb.red, CHROMATICITY_EPSILON)
            && self.green.approx_eq(srgb.green, CHROMATICITY_EPSILON)
            && self.blue.approx_eq(srgb.blue, CHROMATICITY_EPSILON)
            && (self.gamma - srgb.gamma).abs() < GAMMA_EPSILON
    }

    pub fn validate(&self) -> Result<()> {
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(MetadataError::InvalidGamma(self.gamma));
        }
        for c in [self.white_point, self.red, self.green, self.blue] {
            c.to_xyz()?;
        }
        Ok(())
    }

    /// Linear RGB → XYZ matrix relative to the image's own whitepoint.
    pub fn rgb_to_xyz(&self) -> Result<Matrix3> {
        let r = self.red.to_xyz()?;
        let g = self.green.to_xyz()?;
        let b = self.blue.to_xyz()?;
        let primaries = [[r[0], g[0], b[0]], [r[1], g[1], b[1]], [r[2], g[2], b[2]]];

        let inverse = invert(&primaries).ok_or(MetadataError::InvalidChromaticity)?;
        let scale = mul_vec(&inverse, self.white_point.to_xyz()?);

        let mut m = primaries;
        for row in m.iter_mut() {
            for (value, s) in row.iter_mut().zip(scale) {
                *value *= s;
            }
        }
        Ok(m)
    }

    /// RGB → XYZ adapted to the D50 connection space. The columns are the
    /// red, green and blue colorants.
    pub fn colorants_d50(&self) -> Result<Matrix3> {
        let adaptation = bradford_adaptation(self.white_point.to_xyz()?, D50_XYZ)
            .ok_or(MetadataError::InvalidChromaticity)?;
        Ok(mul(&adaptation, &self.rgb_to_xyz()?))
    }
}

/// Bradford transform taking colours under `source` white to `destination`.
pub fn bradford_adaptation(source: [f64; 3], destination: [f64; 3]) -> Option<Matrix3> {
    let src_lms = mul_vec(&BRADFORD_XYZ_TO_LMS, source);
    let dst_lms = mul_vec(&BRADFORD_XYZ_TO_LMS, destination);

    let mut gain = [[0.0; 3]; 3];
    for i in 0..3 {
        if src_lms[i].abs() < f64::EPSILON {
            return None;
        }
        gain[i][i] = dst_lms[i] / src_lms[i];
    }

    Some(mul(&BRADFORD_LMS_TO_XYZ, &mul(&gain, &BRADFORD_XYZ_TO_LMS)))
}

fn mul(a: &Matrix3, b: &Matrix3) -> Matrix3 {
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

fn mul_vec(m: &Matrix3, v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn invert(m: &Matrix3) -> Option<Matrix3> {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);

    if det.abs() < 1e-12 || !det.is_finite() {
        return None;
    }
    let inv_det = 1.0 / det;

    Some([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ])
}
