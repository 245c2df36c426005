//! Parser for segment files: one cylinder per line, given by its two ends.
//!
//! ```text
//! # comment
//! segment #FF0000 50 0 (300, 0, 0) (0, 0, 0) 32 closed
//! segment 0x00FFFF 10 10 (50, 300, -200) (250, 300, -200)
//! ```
//!
//! Fields: color, top radius, bottom radius, top point, bottom point, then
//! optionally the radial segment count and `open` or `closed`.
use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Point3;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while_m_n},
    character::complete::{char, digit1, space0, space1},
    combinator::{all_consuming, map_res, opt, value, verify},
    number::complete::float,
    sequence::{delimited, preceded, tuple},
    IResult,
};
use thiserror::Error;
use tracing::debug;

use crate::geometry::{CylinderParams, GeometryError, Mesh};
use crate::scene::{Color, Material, NodeId, Scene, SceneError};

#[derive(Debug, Error)]
pub enum SegmentFileError {
    #[error("line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("Failed to read segment file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One parsed `segment` line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentSpec {
    pub color: Color,
    pub radius_top: f32,
    pub radius_bottom: f32,
    pub top: Point3<f32>,
    pub bottom: Point3<f32>,
    pub radial_segments: u32,
    pub open_ended: bool,
}

impl SegmentSpec {
    pub fn params(&self) -> CylinderParams {
        CylinderParams::new(self.radius_top, self.radius_bottom, 0.0)
            .radial_segments(self.radial_segments)
            .open_ended(self.open_ended)
    }

    /// Mesh already placed in world space
    pub fn build(&self) -> Result<Mesh, GeometryError> {
        Mesh::cylinder_from_ends(&self.params(), self.top, self.bottom)
    }

    /// Add as a node placed by its local matrix
    pub fn add_to(&self, scene: &mut Scene, parent: NodeId, name: impl Into<String>) -> Result<NodeId, SceneError> {
        scene.add_cylinder_from_ends(
            parent,
            name,
            &self.params(),
            self.top,
            self.bottom,
            Material::new(self.color),
        )
    }
}

pub fn load_segment_file(path: impl AsRef<Path>) -> Result<Vec<SegmentSpec>, SegmentFileError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| SegmentFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_segment_file(&text)
}

pub fn parse_segment_file(input: &str) -> Result<Vec<SegmentSpec>, SegmentFileError> {
    let mut specs = Vec::new();

    for (index, line) in input.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match all_consuming(segment_line)(line) {
            Ok((_, spec)) => specs.push(spec),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let column = line.len() - e.input.len() + 1;
                let near: String = e.input.chars().take(16).collect();
                return Err(SegmentFileError::Syntax {
                    line: index + 1,
                    column,
                    message: if near.is_empty() {
                        "unexpected end of line".to_string()
                    } else {
                        format!("unexpected input '{near}'")
                    },
                });
            }
            Err(nom::Err::Incomplete(_)) => {
                return Err(SegmentFileError::Syntax {
                    line: index + 1,
                    column: line.len() + 1,
                    message: "incomplete line".to_string(),
                });
            }
        }
    }

    debug!(count = specs.len(), "parsed segment file");
    Ok(specs)
}

fn segment_line(input: &str) -> IResult<&str, SegmentSpec> {
    let (input, _) = preceded(space0, tag("segment"))(input)?;
    let (input, color) = preceded(space1, parse_color)(input)?;
    let (input, radius_top) = preceded(space1, finite_float)(input)?;
    let (input, radius_bottom) = preceded(space1, finite_float)(input)?;
    let (input, top) = preceded(space1, parse_point)(input)?;
    let (input, bottom) = preceded(space1, parse_point)(input)?;
    let (input, radial_segments) =
        opt(preceded(space1, map_res(digit1, str::parse::<u32>)))(input)?;
    let (input, open_ended) = opt(preceded(
        space1,
        alt((value(true, tag("open")), value(false, tag("closed")))),
    ))(input)?;
    let (input, _) = space0(input)?;

    Ok((
        input,
        SegmentSpec {
            color,
            radius_top,
            radius_bottom,
            top,
            bottom,
            radial_segments: radial_segments.unwrap_or(CylinderParams::DEFAULT_SEGMENTS),
            open_ended: open_ended.unwrap_or(false),
        },
    ))
}

fn parse_color(input: &str) -> IResult<&str, Color> {
    let (input, _) = alt((tag("#"), tag("0x"), tag("0X")))(input)?;
    let (input, rgb) = map_res(
        take_while_m_n(6, 6, |c: char| c.is_ascii_hexdigit()),
        |digits| u32::from_str_radix(digits, 16),
    )(input)?;
    Ok((input, Color(rgb)))
}

/// `float` also accepts `nan` and `inf`, which no segment can use
fn finite_float(input: &str) -> IResult<&str, f32> {
    verify(float, |v: &f32| v.is_finite())(input)
}

fn parse_point(input: &str) -> IResult<&str, Point3<f32>> {
    let (input, (x, y, z)) = delimited(
        char('('),
        tuple((
            delimited(space0, finite_float, space0),
            preceded(char(','), delimited(space0, finite_float, space0)),
            preceded(char(','), delimited(space0, finite_float, space0)),
        )),
        char(')'),
    )(input)?;
    Ok((input, Point3::new(x, y, z)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignError;

    #[test]
    fn test_parse_full_line() {
        let specs =
            parse_segment_file("segment #FF0000 50 0 (300, 0, 0) (0, 0, 0) 16 open\n").unwrap();
        assert_eq!(
            specs,
            vec![SegmentSpec {
                color: Color::RED,
                radius_top: 50.0,
                radius_bottom: 0.0,
                top: Point3::new(300.0, 0.0, 0.0),
                bottom: Point3::origin(),
                radial_segments: 16,
                open_ended: true,
            }]
        );
    }

    #[test]
    fn test_defaults_and_comments() {
        let text = "\
# magenta diagonal
  segment 0xff00ff 50 0 (250,300,-200) (-150, 100, 0)

segment #00ffff 1.5 2.5 ( 50 , 300 , -200 ) (250, 300, -200) closed
";
        let specs = parse_segment_file(text).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].color, Color::MAGENTA);
        assert_eq!(specs[0].radial_segments, CylinderParams::DEFAULT_SEGMENTS);
        assert!(!specs[0].open_ended);
        assert_eq!(specs[1].bottom, Point3::new(250.0, 300.0, -200.0));
        assert_eq!(specs[1].radius_top, 1.5);
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let text = "segment #FF0000 50 0 (300, 0, 0) (0, 0, 0)\nsegment #FF0000 50 (1, 2, 3)\n";
        match parse_segment_file(text) {
            Err(SegmentFileError::Syntax { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        let result = parse_segment_file("segment #FF0000 50 0 (1, 0, 0) (0, 0, 0) 8 open extra");
        assert!(matches!(result, Err(SegmentFileError::Syntax { line: 1, .. })));
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        for text in [
            "segment #FFFFFF 1 1 (nan, 0, 0) (0, 0, 0)",
            "segment #FFFFFF 1 1 (1, 0, 0) (0, -inf, 0)",
            "segment #FFFFFF infinity 1 (1, 0, 0) (0, 0, 0)",
        ] {
            assert!(
                matches!(parse_segment_file(text), Err(SegmentFileError::Syntax { line: 1, .. })),
                "accepted {text}"
            );
        }
    }

    #[test]
    fn test_oversized_segment_count_fails_on_build() {
        let specs =
            parse_segment_file("segment #FFFFFF 1 1 (1, 0, 0) (0, 0, 0) 4000000000").unwrap();
        assert_eq!(specs[0].radial_segments, 4_000_000_000);
        assert!(matches!(
            specs[0].build(),
            Err(GeometryError::TooManySegments { got: 4_000_000_000, .. })
        ));
    }

    #[test]
    fn test_degenerate_segment_fails_on_build() {
        let specs = parse_segment_file("segment #FFFFFF 1 1 (1, 1, 1) (1, 1, 1)").unwrap();
        assert!(matches!(
            specs[0].build(),
            Err(GeometryError::Align(AlignError::DegenerateSegment { .. }))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = load_segment_file("/nonexistent/rig3d/segments.txt");
        assert!(matches!(result, Err(SegmentFileError::Io { .. })));
    }
}
