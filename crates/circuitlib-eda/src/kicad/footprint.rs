use crate::kicad::model::ModelIndex;
use crate::{
    EdaError, Footprint, Model3D, PadType, Pin, PinType, Units, FOOTPRINT_PADDING,
    FOOTPRINT_SIZE_FLOOR,
};
use circuitlib_sexpr::{parse, Sexpr};

/// A footprint as read from one `.kicad_mod` file, before model resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintDef {
    pub name: String,
    pub library: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub pads: Vec<FootprintPad>,
    pub models: Vec<ModelRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FootprintPad {
    pub number: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub pad_type: PadType,
}

/// A `(model "path" (offset ...) (scale ...) (rotate ...))` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRef {
    pub path: String,
    pub offset: Option<[f64; 3]>,
    pub scale: Option<[f64; 3]>,
    pub rotation: Option<[f64; 3]>,
}

impl ModelRef {
    /// File name without directories or extension, e.g. `R_0402_1005Metric`.
    pub fn base_name(&self) -> &str {
        let file = self
            .path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str());
        match file.rfind('.') {
            Some(dot) if dot > 0 => &file[..dot],
            _ => file,
        }
    }

    /// Resolve against the model index; declared transforms override the defaults.
    pub fn resolve(&self, index: &ModelIndex) -> Option<Model3D> {
        let mut model = index.lookup(self.base_name())?.clone();
        if let Some(offset) = self.offset {
            model.offset = offset;
        }
        if let Some(scale) = self.scale {
            model.scale = scale;
        }
        if let Some(rotation) = self.rotation {
            model.rotation = rotation;
        }
        Some(model)
    }
}

impl FootprintDef {
    /// Build the catalog footprint: pads become pins, the first declared
    /// model found in the index is attached.
    pub fn resolve(&self, models: &ModelIndex) -> Footprint {
        let (width, height) = pad_dimensions(&self.pads);
        let model3d = self.models.iter().find_map(|m| m.resolve(models));
        if model3d.is_none() && !self.models.is_empty() {
            log::debug!("No indexed 3D model for footprint {}", self.name);
        }

        Footprint {
            name: Some(self.name.clone()),
            width,
            height,
            units: Units::Millimeter,
            pins: self
                .pads
                .iter()
                .map(|pad| Pin {
                    x: pad.x,
                    y: pad.y,
                    pin_type: PinType::Pad(pad.pad_type),
                    number: Some(pad.number.clone()),
                    name: Some(pad.number.clone()),
                })
                .collect(),
            model3d,
            tags: self.tags.clone(),
        }
    }
}

/// Pad extents (centre plus or minus half size) with 10% padding, floored.
pub fn pad_dimensions(pads: &[FootprintPad]) -> (f64, f64) {
    if pads.is_empty() {
        return (FOOTPRINT_SIZE_FLOOR, FOOTPRINT_SIZE_FLOOR);
    }

    let mut min = (f64::INFINITY, f64::INFINITY);
    let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for pad in pads {
        min.0 = min.0.min(pad.x - pad.width / 2.0);
        min.1 = min.1.min(pad.y - pad.height / 2.0);
        max.0 = max.0.max(pad.x + pad.width / 2.0);
        max.1 = max.1.max(pad.y + pad.height / 2.0);
    }

    let padded = |lo: f64, hi: f64| ((hi - lo) * FOOTPRINT_PADDING).max(FOOTPRINT_SIZE_FLOOR);
    (padded(min.0, max.0), padded(min.1, max.1))
}

/// Parse one footprint file. `name` is the file name without extension and
/// `library` the `.pretty` folder it came from.
pub fn parse_footprint(content: &str, name: &str, library: &str) -> Result<FootprintDef, EdaError> {
    let root = parse(content)?;
    // KiCad 5 and older wrote (module ...) instead of (footprint ...).
    if !root.is_form("footprint") && !root.is_form("module") {
        return Err(EdaError::UnexpectedRoot {
            expected: "footprint",
            found: root.tag().unwrap_or("<atom>").to_string(),
        });
    }

    let text = |field: &str| {
        root.child(field)
            .and_then(|f| f.atom_arg(0))
            .map(str::to_string)
            .filter(|s| !s.trim().is_empty())
    };

    // Unnumbered pads (paste apertures, NPTH holes) are not electrical.
    let numbered: Vec<&Sexpr> = root
        .children("pad")
        .filter(|pad| pad.atom_arg(0).is_some_and(|n| !n.trim().is_empty()))
        .collect();
    let pads: Vec<FootprintPad> = numbered.iter().copied().filter_map(parse_pad).collect();
    let skipped = numbered.len() - pads.len();
    if skipped > 0 {
        log::debug!("Skipped {skipped} malformed pads in footprint {name}");
    }

    Ok(FootprintDef {
        name: name.to_string(),
        library: library.to_string(),
        description: text("descr"),
        tags: text("tags")
            .map(|t| t.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        pads,
        models: root.children("model").filter_map(parse_model).collect(),
    })
}

// Format: (pad "1" smd roundrect (at X Y [ANGLE]) (size W H) (layers ...) ...)
fn parse_pad(pad: &Sexpr) -> Option<FootprintPad> {
    let number = pad.atom_arg(0)?.to_string();
    let at = pad.child("at")?;
    let size = pad.child("size")?;
    let (mut width, mut height) = (size.f64_arg(0)?, size.f64_arg(1)?);

    let angle = at.f64_arg(2).unwrap_or(0.0);
    if (angle.rem_euclid(180.0) - 90.0).abs() < 1e-6 {
        std::mem::swap(&mut width, &mut height);
    }

    Some(FootprintPad {
        pad_type: PadType::from_pad_number(&number),
        number,
        x: at.f64_arg(0)?,
        y: at.f64_arg(1)?,
        width,
        height,
    })
}

fn parse_model(model: &Sexpr) -> Option<ModelRef> {
    let xyz = |field: &str| -> Option<[f64; 3]> {
        let xyz = model.child(field)?.child("xyz")?;
        Some([xyz.f64_arg(0)?, xyz.f64_arg(1)?, xyz.f64_arg(2)?])
    };

    Some(ModelRef {
        path: model.atom_arg(0)?.to_string(),
        offset: xyz("offset").or_else(|| xyz("at")),
        scale: xyz("scale"),
        rotation: xyz("rotate"),
    })
}
