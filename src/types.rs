//! Domain-specific value types shared across the pipeline

use dicom::encoding::TransferSyntaxIndex;
use dicom::transfer_syntax::TransferSyntaxRegistry;
use std::fmt;
use std::str::FromStr;

pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";

/// DICOM transfer syntax (UID, name)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSyntax {
    pub uid: String,
    pub name: String,
}

impl TransferSyntax {
    /// Look up a transfer syntax by UID, trimming DICOM padding.
    #[must_use]
    pub fn from_uid(uid: &str) -> Self {
        let uid = uid.trim_end_matches(['\0', ' ']).trim().to_string();
        let name = TransferSyntaxRegistry
            .get(&uid)
            .map_or_else(|| "Unknown".to_string(), |ts| ts.name().to_string());

        Self { uid, name }
    }

    #[must_use]
    pub fn implicit_vr_little_endian() -> Self {
        Self::from_uid(IMPLICIT_VR_LITTLE_ENDIAN)
    }

    #[must_use]
    pub fn explicit_vr_little_endian() -> Self {
        Self::from_uid(EXPLICIT_VR_LITTLE_ENDIAN)
    }

    /// Only the two native little-endian syntaxes carry pixel data we can read directly.
    #[inline]
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.uid == IMPLICIT_VR_LITTLE_ENDIAN || self.uid == EXPLICIT_VR_LITTLE_ENDIAN
    }

    #[inline]
    #[must_use]
    pub fn is_explicit_vr(&self) -> bool {
        self.uid != IMPLICIT_VR_LITTLE_ENDIAN
    }
}

impl fmt::Display for TransferSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{name} ({uid})", name = self.name, uid = self.uid)
    }
}

/// SOP Class (UID, name)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SOPClass {
    pub uid: String,
    pub name: String,
}

impl SOPClass {
    #[must_use]
    pub fn new(uid: String, name: String) -> Self {
        Self { uid, name }
    }
}

impl fmt::Display for SOPClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{name} ({uid})", name = self.name, uid = self.uid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub rows: u16,
    pub cols: u16,
}

impl Dimensions {
    #[must_use]
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    #[inline]
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        usize::from(self.rows) * usize::from(self.cols)
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.rows > 0 && self.cols > 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{cols}x{rows}", cols = self.cols, rows = self.rows)
    }
}

/// Rescale parameters for converting stored sample values to real units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RescaleParams {
    pub slope: f64,
    pub intercept: f64,
}

impl RescaleParams {
    #[must_use]
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    #[inline(always)]
    #[must_use]
    // Hot path: called for every sample during windowing
    pub fn apply(&self, stored: f64) -> f64 {
        stored.mul_add(self.slope, self.intercept)
    }
}

impl Default for RescaleParams {
    fn default() -> Self {
        Self::new(1.0, 0.0)
    }
}

impl fmt::Display for RescaleParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slope={slope}, intercept={intercept}",
            slope = self.slope,
            intercept = self.intercept
        )
    }
}

/// Window center/width pair used to map real-world values onto gray levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowLevel {
    pub center: f64,
    pub width: f64,
}

impl WindowLevel {
    #[must_use]
    pub fn new(center: f64, width: f64) -> Self {
        Self { center, width }
    }

    /// Width used for arithmetic. Non-positive or NaN widths become 1.
    #[inline]
    #[must_use]
    pub fn effective_width(&self) -> f64 {
        if self.width > 0.0 { self.width } else { 1.0 }
    }

    /// Window covering the closed range `[lo, hi]`.
    #[must_use]
    pub fn from_range(lo: f64, hi: f64) -> Self {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let width = (hi - lo).max(1.0);
        Self::new((lo + hi) / 2.0, width)
    }
}

impl fmt::Display for WindowLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C={center} W={width}", center = self.center, width = self.width)
    }
}

/// Acquisition modality at series level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Ct,
    Mri,
    XRay,
    Ultrasound,
    Other,
}

impl Modality {
    /// Map a DICOM (0008,0060) code string onto a series modality.
    #[must_use]
    pub fn from_dicom_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "CT" => Self::Ct,
            "MR" => Self::Mri,
            "CR" | "DX" | "XA" | "RF" | "MG" | "IO" | "PX" => Self::XRay,
            "US" => Self::Ultrasound,
            _ => Self::Other,
        }
    }
}

impl FromStr for Modality {
    type Err = ();

    /// Parse a free-form modality hint such as "MRI" or "x-ray".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();

        match normalized.as_str() {
            "CT" => Ok(Self::Ct),
            "MR" | "MRI" => Ok(Self::Mri),
            "XRAY" | "CR" | "DX" => Ok(Self::XRay),
            "US" | "ULTRASOUND" => Ok(Self::Ultrasound),
            "OTHER" => Ok(Self::Other),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ct => write!(f, "CT"),
            Self::Mri => write!(f, "MRI"),
            Self::XRay => write!(f, "X-Ray"),
            Self::Ultrasound => write!(f, "Ultrasound"),
            Self::Other => write!(f, "Other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modality_hint_parsing() {
        assert_eq!("MRI".parse::<Modality>(), Ok(Modality::Mri));
        assert_eq!("x-ray".parse::<Modality>(), Ok(Modality::XRay));
        assert_eq!(" Ultrasound ".parse::<Modality>(), Ok(Modality::Ultrasound));
        assert!("PET-ish".parse::<Modality>().is_err());
    }

    #[test]
    fn test_modality_from_dicom_code() {
        assert_eq!(Modality::from_dicom_code("CT"), Modality::Ct);
        assert_eq!(Modality::from_dicom_code("MR "), Modality::Mri);
        assert_eq!(Modality::from_dicom_code("DX"), Modality::XRay);
        assert_eq!(Modality::from_dicom_code("NM"), Modality::Other);
    }

    #[test]
    fn test_window_from_range() {
        let window = WindowLevel::from_range(100.0, -100.0);
        assert_eq!(window.center, 0.0);
        assert_eq!(window.width, 200.0);

        // Flat images still get a usable width
        let flat = WindowLevel::from_range(7.0, 7.0);
        assert_eq!(flat.width, 1.0);
    }

    #[test]
    fn test_effective_width() {
        assert_eq!(WindowLevel::new(0.0, -5.0).effective_width(), 1.0);
        assert_eq!(WindowLevel::new(0.0, f64::NAN).effective_width(), 1.0);
        assert_eq!(WindowLevel::new(0.0, 40.0).effective_width(), 40.0);
    }

    #[test]
    fn test_transfer_syntax_support() {
        assert!(TransferSyntax::implicit_vr_little_endian().is_supported());
        assert!(!TransferSyntax::implicit_vr_little_endian().is_explicit_vr());
        assert!(TransferSyntax::from_uid("1.2.840.10008.1.2.1\0").is_supported());
        assert!(!TransferSyntax::from_uid("1.2.840.10008.1.2.2").is_supported());
        assert!(!TransferSyntax::from_uid("1.2.840.10008.1.2.4.50").is_supported());
    }
}
