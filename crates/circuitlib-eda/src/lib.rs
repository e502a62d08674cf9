pub mod classify;
pub mod kicad;
pub mod matcher;

use circuitlib_sexpr::ParseError;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub use classify::{describe, ClassifierStrategy, ComponentType, ElectricalDefaults};
pub use kicad::footprint::{parse_footprint, FootprintDef, FootprintPad, ModelRef};
pub use kicad::model::{model_format, ModelIndex};
pub use kicad::symbol::{parse_symbol_library, parse_symbol_text, RawSymbol};
pub use matcher::{FootprintLibrary, MatchKind, Reconciler};

/// Smallest placeholder size derived from symbol pins, in grid steps.
pub const SYMBOL_SIZE_FLOOR: f64 = 2.0;
/// Smallest footprint size derived from pads, in millimetres.
pub const FOOTPRINT_SIZE_FLOOR: f64 = 2.54;
/// Symbol-sheet grid pitch used to normalize placeholder sizes.
pub const SYMBOL_GRID: f64 = 2.54;
/// Padding factor applied to the pad bounding box.
pub const FOOTPRINT_PADDING: f64 = 1.1;

#[derive(Debug, Error)]
pub enum EdaError {
    #[error("S-expression parse error: {0}")]
    Sexpr(#[from] ParseError),

    #[error("Expected a ({expected} ...) form, found {found}")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },

    #[error("Not a legacy KiCad symbol library (missing EESchema-LIBRARY header)")]
    NotLegacyLibrary,

    #[error("Unsupported library file type: {0}")]
    UnsupportedFileType(String),
}

/// Electrical classification of a symbol pin, from its KiCad electrical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolPinType {
    Positive,
    Negative,
    Other,
}

impl SymbolPinType {
    pub fn from_electrical(kind: &str) -> Self {
        match kind {
            "power_in" => SymbolPinType::Positive,
            "power_out" => SymbolPinType::Negative,
            _ => SymbolPinType::Other,
        }
    }
}

/// Classification of a footprint pad, from its number or label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadType {
    Positive,
    Negative,
    Signal,
    Ground,
    Power,
}

impl PadType {
    pub fn from_pad_number(number: &str) -> Self {
        let label = number.to_lowercase();
        match label.as_str() {
            "1" | "a" | "anode" => PadType::Positive,
            "2" | "k" | "cathode" => PadType::Negative,
            _ if label.contains("gnd") => PadType::Ground,
            _ if ["vcc", "vdd", "vin"].iter().any(|p| label.contains(p)) => PadType::Power,
            _ => PadType::Signal,
        }
    }
}

/// The two classification schemes stay distinct; both serialize as plain strings.
///
/// "positive" and "negative" are shared, so a bare string decodes as a pad
/// type. Symbol pins in a catalog are reinterpreted by their container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PinType {
    Pad(PadType),
    Symbol(SymbolPinType),
}

impl PinType {
    fn into_symbol(self) -> Self {
        match self {
            PinType::Pad(PadType::Positive) => PinType::Symbol(SymbolPinType::Positive),
            PinType::Pad(PadType::Negative) => PinType::Symbol(SymbolPinType::Negative),
            PinType::Pad(_) => PinType::Symbol(SymbolPinType::Other),
            symbol => symbol,
        }
    }
}

fn into_symbol_pins(pins: Vec<Pin>) -> Vec<Pin> {
    pins.into_iter()
        .map(|pin| Pin {
            pin_type: pin.pin_type.into_symbol(),
            ..pin
        })
        .collect()
}

fn deserialize_symbol_pins<'de, D>(deserializer: D) -> Result<Option<Vec<Pin>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Pin>>::deserialize(deserializer)?.map(into_symbol_pins))
}

/// Coordinate space of a footprint and its pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    /// Symbol-sheet coordinates; sizes are in grid steps.
    #[serde(rename = "symbol")]
    Symbol,
    /// Board coordinates in millimetres.
    #[serde(rename = "mm")]
    Millimeter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "type")]
    pub pin_type: PinType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelFormat {
    #[serde(rename = "STEP")]
    Step,
    #[serde(rename = "VRML")]
    Vrml,
    #[serde(rename = "unknown")]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model3D {
    pub filename: String,
    pub path: String,
    pub format: ModelFormat,
    pub scale: [f64; 3],
    pub offset: [f64; 3],
    pub rotation: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "FootprintRecord")]
pub struct Footprint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub width: f64,
    pub height: f64,
    pub units: Units,
    pub pins: Vec<Pin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model3d: Option<Model3D>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Wire form of [`Footprint`]; placeholder footprints carry symbol pins.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FootprintRecord {
    #[serde(default)]
    name: Option<String>,
    width: f64,
    height: f64,
    units: Units,
    pins: Vec<Pin>,
    #[serde(default)]
    model3d: Option<Model3D>,
    #[serde(default)]
    tags: Vec<String>,
}

impl From<FootprintRecord> for Footprint {
    fn from(record: FootprintRecord) -> Self {
        let pins = match record.units {
            Units::Symbol => into_symbol_pins(record.pins),
            Units::Millimeter => record.pins,
        };
        Footprint {
            name: record.name,
            width: record.width,
            height: record.height,
            units: record.units,
            pins,
            model3d: record.model3d,
            tags: record.tags,
        }
    }
}

/// A unified catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub name: String,
    pub description: String,
    pub footprint: Footprint,
    pub library: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasheet: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electrical_defaults: Option<ElectricalDefaults>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_symbol_pins"
    )]
    pub symbol_pins: Option<Vec<Pin>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<MatchKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schematic_path: Option<String>,
}

/// One drawing command of a symbol's schematic outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    Close,
}

/// Render drawing commands as SVG path data, e.g. `M0,0 L1,0 Z`.
pub fn svg_path(commands: &[PathCommand]) -> String {
    commands
        .iter()
        .map(|command| match command {
            PathCommand::MoveTo(x, y) => format!("M{x},{y}"),
            PathCommand::LineTo(x, y) => format!("L{x},{y}"),
            PathCommand::Close => "Z".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_classification() {
        for number in ["1", "A", "anode", "a"] {
            assert_eq!(PadType::from_pad_number(number), PadType::Positive);
        }
        for number in ["2", "K", "cathode"] {
            assert_eq!(PadType::from_pad_number(number), PadType::Negative);
        }
        assert_eq!(PadType::from_pad_number("GND"), PadType::Ground);
        assert_eq!(PadType::from_pad_number("AGND_2"), PadType::Ground);
        assert_eq!(PadType::from_pad_number("VCC"), PadType::Power);
        assert_eq!(PadType::from_pad_number("Vin"), PadType::Power);
        assert_eq!(PadType::from_pad_number("3"), PadType::Signal);
        assert_eq!(PadType::from_pad_number(""), PadType::Signal);
    }

    #[test]
    fn test_symbol_pin_classification() {
        assert_eq!(SymbolPinType::from_electrical("power_in"), SymbolPinType::Positive);
        assert_eq!(SymbolPinType::from_electrical("power_out"), SymbolPinType::Negative);
        assert_eq!(SymbolPinType::from_electrical("passive"), SymbolPinType::Other);
    }

    #[test]
    fn test_pin_types_serialize_as_strings() {
        let pad = serde_json::to_value(PinType::Pad(PadType::Ground)).unwrap();
        let sym = serde_json::to_value(PinType::Symbol(SymbolPinType::Other)).unwrap();
        assert_eq!(pad, "ground");
        assert_eq!(sym, "other");
    }

    #[test]
    fn test_component_json_keeps_symbol_pin_types() {
        let symbol_pin = |x: f64, pin_type| Pin {
            x,
            y: 0.0,
            pin_type: PinType::Symbol(pin_type),
            number: Some("1".to_string()),
            name: None,
        };
        let pins = vec![
            symbol_pin(0.0, SymbolPinType::Positive),
            symbol_pin(2.54, SymbolPinType::Negative),
            symbol_pin(5.08, SymbolPinType::Other),
        ];
        let component = Component {
            component_type: ComponentType::PowerSupply,
            name: "Battery_Cell".to_string(),
            description: "Power Supply".to_string(),
            footprint: Footprint {
                name: None,
                width: 2.0,
                height: 2.0,
                units: Units::Symbol,
                pins: pins.clone(),
                model3d: None,
                tags: Vec::new(),
            },
            library: "Device".to_string(),
            value: None,
            datasheet: None,
            keywords: Vec::new(),
            electrical_defaults: None,
            symbol_pins: Some(pins),
            matched_by: None,
            schematic_path: None,
        };

        let json = serde_json::to_string(&component).unwrap();
        let decoded: Component = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, component);
    }

    #[test]
    fn test_board_footprint_keeps_pad_types() {
        let json = r#"{"width":2.54,"height":2.54,"units":"mm",
            "pins":[{"x":0,"y":0,"type":"positive"},{"x":1,"y":0,"type":"ground"}]}"#;
        let footprint: Footprint = serde_json::from_str(json).unwrap();
        assert_eq!(footprint.pins[0].pin_type, PinType::Pad(PadType::Positive));
        assert_eq!(footprint.pins[1].pin_type, PinType::Pad(PadType::Ground));
        assert!(footprint.tags.is_empty());
    }

    #[test]
    fn test_svg_path() {
        let path = svg_path(&[
            PathCommand::MoveTo(0.0, 0.0),
            PathCommand::LineTo(1.016, -2.54),
            PathCommand::Close,
        ]);
        assert_eq!(path, "M0,0 L1.016,-2.54 Z");
    }
}
