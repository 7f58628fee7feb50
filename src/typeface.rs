//! Typeface descriptions in the three.js JSON format.
//!
//! A typeface file stores, per glyph, its horizontal advance (`ha`) and an
//! outline (`o`) encoded as a whitespace separated command stream:
//!
//! ```text
//! m x y                 move to
//! l x y                 line to
//! q x y cx cy           quadratic curve to (x, y) with control point (cx, cy)
//! b x y c1x c1y c2x c2y cubic curve to (x, y) with two control points
//! ```
//!
//! Note that the end point comes first for curves.

use std::collections::HashMap;

use cgmath::{Vector2, VectorSpace};
use serde::Deserialize;
use thiserror::Error;

use crate::geometry::extrude::{Contour, signed_area};

#[derive(Debug, Error, PartialEq)]
pub enum TypefaceError {
    #[error("unknown outline command `{0}`")]
    UnknownCommand(String),
    #[error("outline command `{0}` is missing coordinates")]
    MissingCoordinate(char),
    #[error("`{0}` is not a valid outline coordinate")]
    InvalidCoordinate(String),
    #[error("glyph `{0}` has an outline that does not start with a move")]
    MissingMove(char),
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypefaceBounds {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Glyph {
    pub ha: f32,
    #[serde(default)]
    pub x_min: f32,
    #[serde(default)]
    pub x_max: f32,
    #[serde(default)]
    pub o: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Typeface {
    pub glyphs: HashMap<String, Glyph>,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub ascender: f32,
    #[serde(default)]
    pub descender: f32,
    #[serde(default)]
    pub underline_thickness: f32,
    pub bounding_box: TypefaceBounds,
    pub resolution: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(Vector2<f32>),
    LineTo(Vector2<f32>),
    QuadTo {
        ctrl: Vector2<f32>,
        to: Vector2<f32>,
    },
    CubicTo {
        ctrl1: Vector2<f32>,
        ctrl2: Vector2<f32>,
        to: Vector2<f32>,
    },
}

impl Typeface {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let typeface: Typeface = serde_json::from_str(json)?;
        anyhow::ensure!(
            typeface.resolution > 0.0,
            "typeface resolution must be positive, got {}",
            typeface.resolution
        );
        Ok(typeface)
    }

    /// The glyph for `ch`, falling back to `?` like most font renderers.
    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        let mut buf = [0; 4];
        self.glyphs
            .get(&*ch.encode_utf8(&mut buf))
            .or_else(|| self.glyphs.get("?"))
    }

    /// Distance between two baselines for a font `size`.
    pub fn line_height(&self, size: f32) -> f32 {
        let scale = size / self.resolution;
        (self.bounding_box.y_max - self.bounding_box.y_min + self.underline_thickness) * scale
    }

    /// Lay out `text` and return the flattened outline of every glyph.
    ///
    /// The origin is the start of the first baseline. Lines advance downwards
    /// on `\n`. Characters without a glyph (and without a `?` fallback) are
    /// skipped and take no space.
    pub fn generate_shapes(
        &self,
        text: &str,
        size: f32,
        curve_segments: u32,
    ) -> Result<Vec<Contour>, TypefaceError> {
        let scale = size / self.resolution;
        let line_height = self.line_height(size);
        let mut offset = Vector2::new(0.0, 0.0);
        let mut contours = Vec::new();

        for ch in text.chars() {
            if ch == '\n' {
                offset.x = 0.0;
                offset.y -= line_height;
                continue;
            }
            let Some(glyph) = self.glyph(ch) else {
                log::warn!(
                    "Character `{}` has no glyph in typeface {}",
                    ch,
                    self.family_name
                );
                continue;
            };
            if let Some(outline) = &glyph.o {
                let commands = parse_outline(outline)?;
                if !matches!(commands.first(), None | Some(PathCommand::MoveTo(_))) {
                    return Err(TypefaceError::MissingMove(ch));
                }
                let mut glyph_contours: Vec<Contour> = flatten(&commands, curve_segments)
                    .into_iter()
                    .map(|c| c.into_iter().map(|p| p * scale + offset).collect())
                    .collect();
                orient_filled_ccw(&mut glyph_contours);
                contours.append(&mut glyph_contours);
            }
            offset.x += glyph.ha * scale;
        }
        Ok(contours)
    }
}

pub fn parse_outline(outline: &str) -> Result<Vec<PathCommand>, TypefaceError> {
    let mut tokens = outline.split_whitespace();
    let mut commands = Vec::new();

    fn coord<'a>(
        tokens: &mut impl Iterator<Item = &'a str>,
        command: char,
    ) -> Result<Vector2<f32>, TypefaceError> {
        let mut next = || -> Result<f32, TypefaceError> {
            let token = tokens
                .next()
                .ok_or(TypefaceError::MissingCoordinate(command))?;
            token
                .parse::<f32>()
                .map_err(|_| TypefaceError::InvalidCoordinate(token.to_string()))
        };
        let x = next()?;
        let y = next()?;
        Ok(Vector2::new(x, y))
    }

    while let Some(token) = tokens.next() {
        let command = match token {
            "m" => PathCommand::MoveTo(coord(&mut tokens, 'm')?),
            "l" => PathCommand::LineTo(coord(&mut tokens, 'l')?),
            "q" => {
                let to = coord(&mut tokens, 'q')?;
                let ctrl = coord(&mut tokens, 'q')?;
                PathCommand::QuadTo { ctrl, to }
            }
            "b" => {
                let to = coord(&mut tokens, 'b')?;
                let ctrl1 = coord(&mut tokens, 'b')?;
                let ctrl2 = coord(&mut tokens, 'b')?;
                PathCommand::CubicTo { ctrl1, ctrl2, to }
            }
            // Contours are always closed.
            "z" => continue,
            other => return Err(TypefaceError::UnknownCommand(other.to_string())),
        };
        commands.push(command);
    }
    Ok(commands)
}

/// Turn path commands into closed polylines, sampling every curve with
/// `curve_segments` straight pieces.
pub fn flatten(commands: &[PathCommand], curve_segments: u32) -> Vec<Contour> {
    let segments = curve_segments.max(1);
    let mut contours: Vec<Contour> = Vec::new();
    let mut current: Contour = Vec::new();
    let mut cursor = Vector2::new(0.0, 0.0);

    for command in commands {
        match *command {
            PathCommand::MoveTo(p) => {
                if !current.is_empty() {
                    contours.push(std::mem::take(&mut current));
                }
                current.push(p);
                cursor = p;
            }
            PathCommand::LineTo(p) => {
                current.push(p);
                cursor = p;
            }
            PathCommand::QuadTo { ctrl, to } => {
                let from = cursor;
                current.extend((1..=segments).map(|k| {
                    let t = k as f32 / segments as f32;
                    let a = from.lerp(ctrl, t);
                    let b = ctrl.lerp(to, t);
                    a.lerp(b, t)
                }));
                cursor = to;
            }
            PathCommand::CubicTo { ctrl1, ctrl2, to } => {
                let from = cursor;
                current.extend((1..=segments).map(|k| {
                    let t = k as f32 / segments as f32;
                    let u = 1.0 - t;
                    from * (u * u * u)
                        + ctrl1 * (3.0 * u * u * t)
                        + ctrl2 * (3.0 * u * t * t)
                        + to * (t * t * t)
                }));
                cursor = to;
            }
        }
    }
    if !current.is_empty() {
        contours.push(current);
    }
    contours
}

/// Fonts disagree on winding. Flip a glyph so that its largest contour (the
/// outer boundary) runs counter-clockwise, which keeps holes clockwise.
fn orient_filled_ccw(contours: &mut [Contour]) {
    let outer = contours
        .iter()
        .map(|c| signed_area(c))
        .max_by(|a, b| a.abs().total_cmp(&b.abs()));
    if outer.is_some_and(|area| area < 0.0) {
        contours.iter_mut().for_each(|c| c.reverse());
    }
}
