use crate::{
    EdaError, Footprint, PathCommand, Pin, PinType, SymbolPinType, Units, SYMBOL_GRID,
    SYMBOL_SIZE_FLOOR,
};
use circuitlib_sexpr::{parse_recovering, Sexpr};
use std::collections::HashMap;

/// One symbol definition as read from a symbol library file.
#[derive(Debug, Default, Clone)]
pub struct RawSymbol {
    pub name: String,
    pub library: String,
    pub extends: Option<String>,
    pub value: Option<String>,
    pub description: Option<String>,
    pub datasheet: Option<String>,
    pub keywords: Vec<String>,
    pub properties: HashMap<String, String>,
    pub pins: Vec<Pin>,
    pub graphics: Vec<PathCommand>,
}

impl RawSymbol {
    pub fn new(name: impl Into<String>, library: impl Into<String>) -> Self {
        RawSymbol {
            name: name.into(),
            library: library.into(),
            ..Default::default()
        }
    }

    /// Placeholder geometry derived from the symbol's own pins. Replaced by
    /// real footprint data when a match is found.
    pub fn placeholder_footprint(&self) -> Footprint {
        let (width, height) = symbol_dimensions(&self.pins);
        Footprint {
            name: None,
            width,
            height,
            units: Units::Symbol,
            pins: self.pins.clone(),
            model3d: None,
            tags: Vec::new(),
        }
    }

    /// Record a property and mirror the well-known keys into named fields.
    pub(crate) fn set_property(&mut self, key: &str, value: &str) {
        let non_empty = || (!value.trim().is_empty()).then(|| value.to_string());
        match key {
            "Value" => self.value = non_empty(),
            "Description" | "ki_description" => {
                if let Some(desc) = non_empty() {
                    self.description = Some(desc);
                }
            }
            "Datasheet" => self.datasheet = non_empty().filter(|v| v != "~"),
            "ki_keywords" => {
                self.keywords = value.split_whitespace().map(str::to_string).collect();
            }
            _ => {}
        }
        self.properties.insert(key.to_string(), value.to_string());
    }

    fn inherit_from(&mut self, parent: &RawSymbol) {
        if self.pins.is_empty() {
            self.pins = parent.pins.clone();
        }
        if self.graphics.is_empty() {
            self.graphics = parent.graphics.clone();
        }
        if self.keywords.is_empty() {
            self.keywords = parent.keywords.clone();
        }
        if self.description.is_none() {
            self.description = parent.description.clone();
        }
        if self.datasheet.is_none() {
            self.datasheet = parent.datasheet.clone();
        }
        for (key, value) in &parent.properties {
            self.properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// Bounding box of the pins divided by the grid pitch, never below the floor.
pub fn symbol_dimensions(pins: &[Pin]) -> (f64, f64) {
    if pins.is_empty() {
        return (SYMBOL_SIZE_FLOOR, SYMBOL_SIZE_FLOOR);
    }
    let span = |coord: fn(&Pin) -> f64| {
        let (lo, hi) = pins
            .iter()
            .map(coord)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        ((hi - lo).abs() / SYMBOL_GRID).max(SYMBOL_SIZE_FLOOR)
    };
    (span(|p| p.x), span(|p| p.y))
}

/// Parse a symbol library, dispatching on the file extension.
pub fn parse_symbol_text(
    content: &str,
    library: &str,
    extension: &str,
) -> Result<Vec<RawSymbol>, EdaError> {
    match extension {
        "kicad_sym" => parse_symbol_library(content, library),
        "lib" => super::legacy::parse_legacy_library(content, library),
        other => Err(EdaError::UnsupportedFileType(other.to_string())),
    }
}

/// Parse a `(kicad_symbol_lib ...)` file. Symbols are returned in file order.
///
/// A syntax error inside one symbol block drops that block and everything
/// after it; the symbols that parsed before it are kept.
pub fn parse_symbol_library(content: &str, library: &str) -> Result<Vec<RawSymbol>, EdaError> {
    let (root, error) = parse_recovering(content)?;
    if let Some(err) = error {
        let complete = root.children("symbol").count();
        if complete == 0 {
            return Err(err.into());
        }
        log::warn!("Malformed symbol block in library {library} ({err}), keeping the {complete} symbols before it");
    }
    if !root.is_form("kicad_symbol_lib") {
        return Err(EdaError::UnexpectedRoot {
            expected: "kicad_symbol_lib",
            found: root.tag().unwrap_or("<atom>").to_string(),
        });
    }

    let mut symbols = Vec::new();
    for block in root.children("symbol") {
        match parse_symbol(block, library) {
            Some(symbol) => symbols.push(symbol),
            None => log::warn!("Skipping unnamed symbol in library {library}"),
        }
    }

    resolve_extends(&mut symbols);
    log::debug!("Parsed {} symbols from {library}", symbols.len());
    Ok(symbols)
}

fn parse_symbol(block: &Sexpr, library: &str) -> Option<RawSymbol> {
    let mut symbol = RawSymbol::new(block.atom_arg(0)?, library);

    for item in block.args() {
        match item.tag() {
            Some("extends") => symbol.extends = item.atom_arg(0).map(str::to_string),
            Some("property") => {
                if let (Some(key), Some(value)) = (item.atom_arg(0), item.atom_arg(1)) {
                    symbol.set_property(key, value);
                }
            }
            _ => {}
        }
    }

    // Pins and graphics live in the nested unit sections ("R_0_1", "R_1_1").
    symbol.pins = block
        .descendants("pin")
        .into_iter()
        .filter_map(parse_pin)
        .collect();

    for polyline in block.descendants("polyline") {
        symbol.graphics.extend(polyline_commands(polyline));
    }
    for rect in block.descendants("rectangle") {
        symbol.graphics.extend(rectangle_commands(rect));
    }

    Some(symbol)
}

// Format: (pin <electrical> <graphic> (at X Y ANGLE) (length L) (name "N") (number "1"))
fn parse_pin(pin: &Sexpr) -> Option<Pin> {
    let electrical = pin.atom_arg(0)?;
    let at = pin.child("at")?;
    let label = |field: &str| {
        pin.child(field)
            .and_then(|f| f.atom_arg(0))
            .map(str::to_string)
    };

    Some(Pin {
        x: at.f64_arg(0)?,
        y: at.f64_arg(1)?,
        pin_type: PinType::Symbol(SymbolPinType::from_electrical(electrical)),
        number: label("number"),
        name: label("name"),
    })
}

fn polyline_commands(polyline: &Sexpr) -> Vec<PathCommand> {
    let Some(pts) = polyline.child("pts") else {
        return Vec::new();
    };
    pts.children("xy")
        .filter_map(|xy| Some((xy.f64_arg(0)?, xy.f64_arg(1)?)))
        .enumerate()
        .map(|(i, (x, y))| {
            if i == 0 {
                PathCommand::MoveTo(x, y)
            } else {
                PathCommand::LineTo(x, y)
            }
        })
        .collect()
}

fn rectangle_commands(rect: &Sexpr) -> Vec<PathCommand> {
    let corner = |name: &str| {
        let c = rect.child(name)?;
        Some((c.f64_arg(0)?, c.f64_arg(1)?))
    };
    match (corner("start"), corner("end")) {
        (Some(start), Some(end)) => closed_rectangle(start, end),
        _ => Vec::new(),
    }
}

pub(crate) fn closed_rectangle((x1, y1): (f64, f64), (x2, y2): (f64, f64)) -> Vec<PathCommand> {
    vec![
        PathCommand::MoveTo(x1, y1),
        PathCommand::LineTo(x2, y1),
        PathCommand::LineTo(x2, y2),
        PathCommand::LineTo(x1, y2),
        PathCommand::Close,
    ]
}

/// Fill derived symbols from their parent within the same library.
fn resolve_extends(symbols: &mut [RawSymbol]) {
    let mut index: HashMap<String, usize> = HashMap::new();
    for (idx, symbol) in symbols.iter().enumerate() {
        index.entry(symbol.name.clone()).or_insert(idx);
    }

    for child_idx in 0..symbols.len() {
        let Some(parent_name) = symbols[child_idx].extends.clone() else {
            continue;
        };
        match index.get(&parent_name) {
            Some(&parent_idx) if parent_idx != child_idx => {
                let parent = symbols[parent_idx].clone();
                symbols[child_idx].inherit_from(&parent);
            }
            _ => log::warn!(
                "Symbol '{}' extends '{}' but parent not found",
                symbols[child_idx].name,
                parent_name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svg_path;

    const DEVICE_LIB: &str = r#"(kicad_symbol_lib (version 20231120) (generator "kicad_symbol_editor")
  (symbol "R" (pin_numbers hide) (pin_names (offset 0)) (in_bom yes) (on_board yes)
    (property "Reference" "R" (at 2.032 0 90) (effects (font (size 1.27 1.27))))
    (property "Value" "R" (at 0 0 90) (effects (font (size 1.27 1.27))))
    (property "Datasheet" "~" (at 0 0 0) (effects (font (size 1.27 1.27)) hide))
    (property "Description" "Resistor" (at 0 0 0) (effects (font (size 1.27 1.27)) hide))
    (property "ki_keywords" "R res resistor" (at 0 0 0) (effects (font (size 1.27 1.27)) hide))
    (symbol "R_0_1"
      (rectangle (start -1.016 -2.54) (end 1.016 2.54)
        (stroke (width 0.254) (type default)) (fill (type none))))
    (symbol "R_1_1"
      (pin passive line (at 0 3.81 270) (length 1.27)
        (name "~" (effects (font (size 1.27 1.27)))) (number "1" (effects (font (size 1.27 1.27)))))
      (pin passive line (at 0 -3.81 90) (length 1.27)
        (name "~" (effects (font (size 1.27 1.27)))) (number "2" (effects (font (size 1.27 1.27)))))))
  (symbol "R_US" (extends "R")
    (property "Value" "R_US" (at 0 0 0) (effects (font (size 1.27 1.27))))
    (property "Description" "Resistor, US symbol" (at 0 0 0) (effects (font (size 1.27 1.27)) hide)))
  (symbol "VCC" (power) (in_bom yes) (on_board yes)
    (property "Value" "VCC" (at 0 3.81 0) (effects (font (size 1.27 1.27))))
    (symbol "VCC_0_1"
      (polyline (pts (xy -0.762 1.27) (xy 0 2.54) (xy 0.762 1.27))
        (stroke (width 0) (type default)) (fill (type none))))
    (symbol "VCC_1_1"
      (pin power_in line (at 0 0 90) (length 0) hide (name "VCC" (effects (font (size 1.27 1.27)))) (number "1" (effects (font (size 1.27 1.27))))))))
"#;

    #[test]
    fn test_symbols_in_file_order() {
        let symbols = parse_symbol_library(DEVICE_LIB, "Device").unwrap();
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["R", "R_US", "VCC"]);
        assert!(symbols.iter().all(|s| s.library == "Device"));
    }

    #[test]
    fn test_properties_and_named_fields() {
        let symbols = parse_symbol_library(DEVICE_LIB, "Device").unwrap();
        let r = &symbols[0];
        assert_eq!(r.value.as_deref(), Some("R"));
        assert_eq!(r.description.as_deref(), Some("Resistor"));
        assert_eq!(r.datasheet, None);
        assert_eq!(r.keywords, vec!["R", "res", "resistor"]);
        assert_eq!(r.properties.get("Reference").map(String::as_str), Some("R"));
    }

    #[test]
    fn test_pins_from_nested_units() {
        let symbols = parse_symbol_library(DEVICE_LIB, "Device").unwrap();
        let r = &symbols[0];
        assert_eq!(r.pins.len(), 2);
        assert_eq!((r.pins[0].x, r.pins[0].y), (0.0, 3.81));
        assert_eq!(r.pins[0].number.as_deref(), Some("1"));
        assert_eq!(r.pins[1].number.as_deref(), Some("2"));
        assert!(r
            .pins
            .iter()
            .all(|p| p.pin_type == PinType::Symbol(SymbolPinType::Other)));

        let vcc = &symbols[2];
        assert_eq!(vcc.pins[0].pin_type, PinType::Symbol(SymbolPinType::Positive));
        assert_eq!(vcc.pins[0].name.as_deref(), Some("VCC"));
    }

    #[test]
    fn test_extends_inherits_pins() {
        let symbols = parse_symbol_library(DEVICE_LIB, "Device").unwrap();
        let us = &symbols[1];
        assert_eq!(us.extends.as_deref(), Some("R"));
        assert_eq!(us.pins.len(), 2);
        assert_eq!(us.value.as_deref(), Some("R_US"));
        assert_eq!(us.description.as_deref(), Some("Resistor, US symbol"));
        assert_eq!(us.keywords, vec!["R", "res", "resistor"]);
    }

    #[test]
    fn test_graphics() {
        let symbols = parse_symbol_library(DEVICE_LIB, "Device").unwrap();
        assert_eq!(
            svg_path(&symbols[0].graphics),
            "M-1.016,-2.54 L1.016,-2.54 L1.016,2.54 L-1.016,2.54 Z"
        );
        assert_eq!(svg_path(&symbols[2].graphics), "M-0.762,1.27 L0,2.54 L0.762,1.27");
    }

    #[test]
    fn test_placeholder_dimensions() {
        let symbols = parse_symbol_library(DEVICE_LIB, "Device").unwrap();
        let fp = symbols[0].placeholder_footprint();
        assert_eq!(fp.units, Units::Symbol);
        assert_eq!(fp.width, SYMBOL_SIZE_FLOOR);
        assert!((fp.height - 3.0).abs() < 1e-9);

        // Single pin collapses to the floor on both axes.
        let vcc = symbols[2].placeholder_footprint();
        assert_eq!((vcc.width, vcc.height), (2.0, 2.0));
        assert_eq!(symbol_dimensions(&[]), (2.0, 2.0));
    }

    #[test]
    fn test_malformed_pins_are_skipped() {
        let content = r#"(kicad_symbol_lib
  (symbol "X"
    (symbol "X_1_1"
      (pin input line (at 1 2 0) (length 2.54) (number "1"))
      (pin input line (length 2.54) (number "2"))
      (pin output line (at bad 0 0) (length 2.54) (number "3"))
      (pin bidirectional line (at -1 -2 180) (length 2.54) (number "4")))))"#;
        let symbols = parse_symbol_library(content, "Test").unwrap();
        let numbers: Vec<_> = symbols[0]
            .pins
            .iter()
            .filter_map(|p| p.number.as_deref())
            .collect();
        assert_eq!(numbers, vec!["1", "4"]);
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        let err = parse_symbol_library("(footprint \"R_0402\")", "Test").unwrap_err();
        assert!(matches!(err, EdaError::UnexpectedRoot { .. }));
        assert!(parse_symbol_library("(kicad_symbol_lib (symbol \"R\"", "Test").is_err());
        assert!(matches!(
            parse_symbol_text("", "Test", "txt"),
            Err(EdaError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_broken_block_keeps_earlier_symbols() {
        let content = r#"(kicad_symbol_lib (version 20231120)
  (symbol "R" (property "Value" "R")
    (symbol "R_1_1" (pin passive line (at 0 3.81 270) (length 1.27) (number "1"))))
  (symbol "C" (property "Value" "C"))
  (symbol "BAD" (property "Value" "oops)
"#;
        let symbols = parse_symbol_library(content, "Device").unwrap();
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["R", "C"]);
        assert_eq!(symbols[0].pins.len(), 1);
    }
}
