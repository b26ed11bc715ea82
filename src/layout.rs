//! Page geometry: lengths, page sizes, cardinal rotations and the affine
//! matrices used when one page is drawn onto another.

use crate::error::{Error, Result};

/// Simple length type in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from centimeters
    pub fn from_cm(cm: f64) -> Self {
        Length(cm * 10.0)
    }

    /// Create a length from points (1/72 inch)
    pub fn from_pt(pt: f64) -> Self {
        Length(pt * 25.4 / 72.0)
    }

    /// Get the value in points (1/72 inch)
    pub fn pt(&self) -> f64 {
        self.0 * 72.0 / 25.4
    }
}

/// Page dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

impl PageDimensions {
    /// Page size given in centimeters
    pub fn from_cm(width: f64, height: f64) -> Self {
        Self {
            width: Length::from_cm(width),
            height: Length::from_cm(height),
        }
    }

    /// Page size matching a raster at 72 dpi, one point per pixel
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self {
            width: Length::from_pt(width as f64),
            height: Length::from_pt(height as f64),
        }
    }
}

/// One of the four rotations a page may carry in its `/Rotate` entry.
///
/// Degrees are clockwise, as PDF viewers apply them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalize `degrees` modulo 360 and map it to a cardinal rotation.
    ///
    /// Anything that is not a multiple of 90 is rejected.
    pub fn from_degrees(degrees: i64) -> Result<Self> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            _ => Err(Error::InvalidRotationValue(degrees)),
        }
    }

    /// Rotation reached after `quarter_turns` clockwise 90 degree steps
    /// (negative values turn counter-clockwise).
    pub fn from_quarter_turns(quarter_turns: i32) -> Self {
        match quarter_turns.rem_euclid(4) {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub fn degrees(self) -> i64 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn quarter_turns(self) -> i32 {
        (self.degrees() / 90) as i32
    }

    /// Add clockwise quarter turns to this rotation.
    pub fn turned(self, quarter_turns: i32) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + quarter_turns)
    }
}

/// Represents a PDF transformation matrix [a b c d e f]
/// where: x' = a*x + c*y + e, y' = b*x + d*y + f
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl TransformMatrix {
    /// Identity matrix (no transformation)
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    /// Rotate counter-clockwise by `degrees`, then scale, then translate.
    ///
    /// `degrees` must be a multiple of 90; the sine/cosine terms are taken
    /// from a table so quarter turns stay exact.
    pub fn rotate_scale_translate(degrees: i64, scale: f64, tx: f64, ty: f64) -> Result<Self> {
        let (cos, sin) = match Rotation::from_degrees(degrees)? {
            Rotation::Deg0 => (1.0, 0.0),
            Rotation::Deg90 => (0.0, 1.0),
            Rotation::Deg180 => (-1.0, 0.0),
            Rotation::Deg270 => (0.0, -1.0),
        };

        Ok(Self {
            a: cos * scale,
            b: sin * scale,
            c: -sin * scale,
            d: cos * scale,
            e: tx,
            f: ty,
        })
    }

    /// Apply the matrix to a point
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Render as the operands of a `cm` operator
    pub fn to_cm_operator(&self) -> String {
        format!(
            "{} {} {} {} {} {} cm",
            fmt_number(self.a),
            fmt_number(self.b),
            fmt_number(self.c),
            fmt_number(self.d),
            fmt_number(self.e),
            fmt_number(self.f),
        )
    }
}

/// Format a number for a content stream: integers without a fraction,
/// everything else with at most four decimals.
fn fmt_number(value: f64) -> String {
    if value == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.4}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Translation offset in points, x to the right, y up, origin bottom-left
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub tx: f64,
    pub ty: f64,
}

impl Offset {
    pub fn new(tx: f64, ty: f64) -> Self {
        Self { tx, ty }
    }
}

/// Width and height of a page's media box, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

/// Offset at which a donor page carrying `rotation` must be drawn (after being
/// turned back by `-rotation`) so that it lands upright at `offset` within the
/// receiver.
///
/// Turning the donor back swings its content below or left of the origin;
/// the translation brings it back to the receiver's top edge.
pub fn composition_offset(
    rotation: Rotation,
    receiver: Extent,
    donor: Extent,
    offset: Offset,
) -> Offset {
    let Offset { mut tx, mut ty } = offset;

    match rotation {
        Rotation::Deg0 => {}
        Rotation::Deg90 => {
            ty += receiver.height;
        }
        Rotation::Deg180 => {
            tx += donor.width;
            ty += receiver.height;
        }
        Rotation::Deg270 => {
            tx += donor.height;
            ty += receiver.height - donor.width;
        }
    }

    Offset { tx, ty }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_conversions() {
        let cm = Length::from_cm(2.54);
        assert!((cm.pt() - 72.0).abs() < 1e-9);

        let pt = Length::from_pt(144.0);
        assert!((pt.0 - 50.8).abs() < 1e-9);
        assert!((pt.pt() - 144.0).abs() < 1e-9);
    }

    #[test]
    fn test_page_dimensions_from_pixels() {
        let dims = PageDimensions::from_pixels(612, 792);
        assert!((dims.width.pt() - 612.0).abs() < 1e-9);
        assert!((dims.height.pt() - 792.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_normalizes_modulo_360() {
        assert_eq!(Rotation::from_degrees(0).unwrap(), Rotation::Deg0);
        assert_eq!(Rotation::from_degrees(450).unwrap(), Rotation::Deg90);
        assert_eq!(Rotation::from_degrees(-90).unwrap(), Rotation::Deg270);
        assert_eq!(Rotation::from_degrees(-540).unwrap(), Rotation::Deg180);
    }

    #[test]
    fn test_rotation_rejects_non_cardinal() {
        let err = Rotation::from_degrees(45).unwrap_err();
        assert!(matches!(err, Error::InvalidRotationValue(45)));
    }

    #[test]
    fn test_rotation_turns() {
        assert_eq!(Rotation::Deg0.turned(-1), Rotation::Deg270);
        assert_eq!(Rotation::Deg270.turned(1), Rotation::Deg0);
        assert_eq!(Rotation::Deg90.turned(2), Rotation::Deg270);
    }

    #[test]
    fn test_matrix_quarter_turns_are_exact() {
        let m = TransformMatrix::rotate_scale_translate(-90, 1.0, 0.0, 0.0).unwrap();
        assert_eq!(m.apply(0.0, 10.0), (10.0, 0.0));
        assert_eq!(m.apply(10.0, 0.0), (0.0, -10.0));
        assert_eq!(m.to_cm_operator(), "0 -1 1 0 0 0 cm");
    }

    #[test]
    fn test_matrix_identity() {
        let m = TransformMatrix::rotate_scale_translate(0, 1.0, 0.0, 0.0).unwrap();
        assert_eq!(m, TransformMatrix::identity());
    }

    #[test]
    fn test_matrix_formats_fractions() {
        let m = TransformMatrix::rotate_scale_translate(0, 0.5, 12.25, -3.0).unwrap();
        assert_eq!(m.to_cm_operator(), "0.5 0 0 0.5 12.25 -3 cm");
    }

    #[test]
    fn test_composition_offset_table() {
        let receiver = Extent { width: 600.0, height: 800.0 };
        let donor = Extent { width: 200.0, height: 300.0 };
        let base = Offset::new(10.0, 20.0);

        assert_eq!(composition_offset(Rotation::Deg0, receiver, donor, base), Offset::new(10.0, 20.0));
        assert_eq!(composition_offset(Rotation::Deg90, receiver, donor, base), Offset::new(10.0, 820.0));
        assert_eq!(composition_offset(Rotation::Deg180, receiver, donor, base), Offset::new(210.0, 820.0));
        assert_eq!(composition_offset(Rotation::Deg270, receiver, donor, base), Offset::new(310.0, 620.0));
    }

    #[test]
    fn test_composition_offset_lands_donor_inside_receiver() {
        // A donor turned back by its own rotation must end up touching the
        // receiver's top edge at the requested offset.
        let receiver = Extent { width: 600.0, height: 800.0 };
        let donor = Extent { width: 200.0, height: 300.0 };

        for rotation in [Rotation::Deg90, Rotation::Deg180, Rotation::Deg270] {
            let off = composition_offset(rotation, receiver, donor, Offset::default());
            let m = TransformMatrix::rotate_scale_translate(-rotation.degrees(), 1.0, off.tx, off.ty)
                .unwrap();

            let corners = [(0.0, 0.0), (donor.width, 0.0), (0.0, donor.height), (donor.width, donor.height)];
            let xs: Vec<f64> = corners.iter().map(|&(x, y)| m.apply(x, y).0).collect();
            let ys: Vec<f64> = corners.iter().map(|&(x, y)| m.apply(x, y).1).collect();

            let min_x = xs.iter().cloned().fold(f64::INFINITY, f64::min);
            let max_y = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(min_x, 0.0, "left edge for {:?}", rotation);
            assert_eq!(max_y, receiver.height, "top edge for {:?}", rotation);
        }
    }
}
