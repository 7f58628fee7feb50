//! Extruded 3D text.

use anyhow::Context as _;
use cgmath::Vector3;

use crate::{
    geometry::{
        MeshData,
        extrude::{ExtrudeOptions, extrude},
    },
    typeface::Typeface,
};

pub const TEXT_SIZE: f32 = 0.5;
pub const CURVE_SEGMENTS: u32 = 12;

pub fn text_options() -> ExtrudeOptions {
    ExtrudeOptions {
        depth: 0.2,
        bevel_enabled: true,
        bevel_thickness: 0.03,
        bevel_size: 0.02,
        bevel_offset: 0.0,
        bevel_segments: 5,
    }
}

/// CPU side of the text object.
#[derive(Clone, Debug, PartialEq)]
pub struct TextMesh {
    pub text: String,
    /// Centred on its bounding box.
    pub geometry: MeshData,
    /// Translation that was applied to centre the geometry.
    pub offset: Vector3<f32>,
}

impl TextMesh {
    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }
}

pub fn build_text(text: &str, typeface: &Typeface) -> anyhow::Result<TextMesh> {
    let contours = typeface
        .generate_shapes(text, TEXT_SIZE, CURVE_SEGMENTS)
        .with_context(|| format!("could not lay out {:?}", text))?;
    let mut geometry = extrude(&contours, &text_options())?;
    let offset = geometry.center();
    Ok(TextMesh {
        text: text.to_string(),
        geometry,
        offset,
    })
}

/// Build the text object for `text`, or nothing while no typeface is loaded.
pub fn rebuild(text: &str, typeface: Option<&Typeface>) -> anyhow::Result<Option<TextMesh>> {
    typeface.map(|typeface| build_text(text, typeface)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two square glyphs. `O` has a square hole.
    const TYPEFACE: &str = r#"{
        "glyphs": {
            "I": { "ha": 600, "x_min": 0, "x_max": 500, "o": "m 0 0 l 500 0 l 500 1000 l 0 1000 z" },
            "O": { "ha": 1100, "x_min": 0, "x_max": 1000,
                   "o": "m 0 0 l 1000 0 l 1000 1000 l 0 1000 z m 250 250 l 250 750 l 750 750 l 750 250 z" },
            " ": { "ha": 400, "x_min": 0, "x_max": 0, "o": "" }
        },
        "familyName": "Test",
        "ascender": 1000,
        "descender": -200,
        "underlineThickness": 50,
        "boundingBox": { "xMin": 0, "xMax": 1000, "yMin": -200, "yMax": 1000 },
        "resolution": 1000
    }"#;

    fn typeface() -> Typeface {
        Typeface::from_json(TYPEFACE).unwrap()
    }

    #[test]
    fn should_produce_nothing_without_typeface() {
        assert_eq!(rebuild("IO", None).unwrap(), None);
    }

    #[test]
    fn should_centre_text_on_bounding_box() {
        let mesh = rebuild("IO", Some(&typeface())).unwrap().unwrap();
        let bbox = mesh.geometry.bounding_box().unwrap();
        let center = bbox.center();
        assert!(center.x.abs() < 1e-5);
        assert!(center.y.abs() < 1e-5);
        assert!(center.z.abs() < 1e-5);
        assert!(mesh.offset.x < 0.0);
    }

    #[test]
    fn should_size_text_by_font_size_and_depth() {
        let mesh = build_text("I", &typeface()).unwrap();
        let size = mesh.geometry.bounding_box().unwrap().size();
        let options = text_options();
        // glyph is 0.25 x 0.5 at size 0.5, the bevel grows it on every side
        assert!((size.x - (0.25 + 2.0 * options.bevel_size)).abs() < 1e-4);
        assert!((size.y - (0.5 + 2.0 * options.bevel_size)).abs() < 1e-4);
        assert!((size.z - (options.depth + 2.0 * options.bevel_thickness)).abs() < 1e-4);
    }

    #[test]
    fn should_build_empty_mesh_for_empty_text() {
        let mesh = rebuild("", Some(&typeface())).unwrap().unwrap();
        assert!(mesh.is_empty());
        assert_eq!(mesh.text, "");
        let blank = build_text("   ", &typeface()).unwrap();
        assert!(blank.is_empty());
    }

    #[test]
    fn should_fail_on_broken_outlines() {
        let broken = TYPEFACE.replace("m 0 0 l 500 0", "m 0 0 x 500 0");
        let typeface = Typeface::from_json(&broken).unwrap();
        assert!(build_text("I", &typeface).is_err());
    }
}
