//! Heuristic component classification from symbol names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical component type of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Resistor,
    Capacitor,
    Inductor,
    Diode,
    Led,
    Transistor,
    Ic,
    Switch,
    Voltmeter,
    Ammeter,
    Oscilloscope,
    PowerSupply,
    Ground,
    Connector,
    Potentiometer,
    Fuse,
    Relay,
    Transformer,
    Audio,
    Reverb,
    VoltageRegulator,
    Sensor,
    Other,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Resistor => "resistor",
            ComponentType::Capacitor => "capacitor",
            ComponentType::Inductor => "inductor",
            ComponentType::Diode => "diode",
            ComponentType::Led => "led",
            ComponentType::Transistor => "transistor",
            ComponentType::Ic => "ic",
            ComponentType::Switch => "switch",
            ComponentType::Voltmeter => "voltmeter",
            ComponentType::Ammeter => "ammeter",
            ComponentType::Oscilloscope => "oscilloscope",
            ComponentType::PowerSupply => "power_supply",
            ComponentType::Ground => "ground",
            ComponentType::Connector => "connector",
            ComponentType::Potentiometer => "potentiometer",
            ComponentType::Fuse => "fuse",
            ComponentType::Relay => "relay",
            ComponentType::Transformer => "transformer",
            ComponentType::Audio => "audio",
            ComponentType::Reverb => "reverb",
            ComponentType::VoltageRegulator => "voltage_regulator",
            ComponentType::Sensor => "sensor",
            ComponentType::Other => "other",
        }
    }

    /// Default electrical parameters for simulation, if the type has any.
    pub fn electrical_defaults(&self) -> Option<ElectricalDefaults> {
        let defaults = ElectricalDefaults::default();
        match self {
            ComponentType::Resistor => Some(ElectricalDefaults {
                resistance: Some(1000.0),
                ..defaults
            }),
            ComponentType::Capacitor => Some(ElectricalDefaults {
                capacitance: Some(1e-6),
                ..defaults
            }),
            ComponentType::Inductor => Some(ElectricalDefaults {
                inductance: Some(1e-3),
                ..defaults
            }),
            ComponentType::Diode | ComponentType::Led => Some(ElectricalDefaults {
                voltage: Some(0.7),
                ..defaults
            }),
            ComponentType::PowerSupply => Some(ElectricalDefaults {
                voltage: Some(5.0),
                ..defaults
            }),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resistance in ohms, capacitance in farads, inductance in henries, voltage in volts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectricalDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resistance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacitance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inductance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
}

/// Which naming heuristic maps symbol names to component types.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierStrategy {
    /// Substring rules over the whole name; unmatched names are `ic`.
    #[default]
    Keyword,
    /// Reference-designator letter first, then a few substrings; unmatched names are `other`.
    Prefix,
}

// Checked in order against the lowercased name.
const KEYWORD_RULES: &[(&[&str], ComponentType)] = &[
    (&["resistor", "r_"], ComponentType::Resistor),
    (&["capacitor", "c_"], ComponentType::Capacitor),
    (&["inductor", "l_"], ComponentType::Inductor),
    (&["diode", "d_"], ComponentType::Diode),
    (&["transistor", "q_"], ComponentType::Transistor),
    (&["ic"], ComponentType::Ic),
    (&["led"], ComponentType::Led),
    (&["switch", "sw_"], ComponentType::Switch),
    (&["voltmeter"], ComponentType::Voltmeter),
    (&["ammeter"], ComponentType::Ammeter),
    (&["oscilloscope"], ComponentType::Oscilloscope),
    (&["power"], ComponentType::PowerSupply),
    (&["gnd"], ComponentType::Ground),
    (&["connector", "conn_"], ComponentType::Connector),
    (&["potentiometer", "pot_"], ComponentType::Potentiometer),
    (&["fuse"], ComponentType::Fuse),
    (&["relay"], ComponentType::Relay),
    (&["transformer"], ComponentType::Transformer),
];

const AUDIO_WORDS: &[&str] = &["audio", "speaker", "mic", "buzzer"];

impl ClassifierStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierStrategy::Keyword => "keyword",
            ClassifierStrategy::Prefix => "prefix",
        }
    }

    pub fn classify(&self, name: &str) -> ComponentType {
        let lower = name.to_lowercase();
        match self {
            ClassifierStrategy::Keyword => classify_keyword(&lower),
            ClassifierStrategy::Prefix => classify_prefix(&lower),
        }
    }
}

impl fmt::Display for ClassifierStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassifierStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keyword" => Ok(ClassifierStrategy::Keyword),
            "prefix" => Ok(ClassifierStrategy::Prefix),
            other => Err(format!(
                "unknown classifier '{other}', expected 'keyword' or 'prefix'"
            )),
        }
    }
}

fn led_or_diode(lower: &str) -> ComponentType {
    if lower.contains("led") {
        ComponentType::Led
    } else {
        ComponentType::Diode
    }
}

fn classify_keyword(lower: &str) -> ComponentType {
    KEYWORD_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lower.contains(n)))
        .map(|&(_, ty)| match ty {
            ComponentType::Diode => led_or_diode(lower),
            ty => ty,
        })
        .unwrap_or(ComponentType::Ic)
}

fn classify_prefix(lower: &str) -> ComponentType {
    if lower.contains("reverb") {
        return ComponentType::Reverb;
    }
    if AUDIO_WORDS.iter().any(|w| lower.contains(w)) {
        return ComponentType::Audio;
    }

    match lower.chars().next() {
        Some('r') => ComponentType::Resistor,
        Some('c') => ComponentType::Capacitor,
        Some('l') => ComponentType::Inductor,
        Some('d') => led_or_diode(lower),
        Some('q') => ComponentType::Transistor,
        Some('u') => ComponentType::Ic,
        Some('j') => ComponentType::Connector,
        Some('s') => ComponentType::Switch,
        Some('t') => ComponentType::Transformer,
        Some('a') => ComponentType::Audio,
        _ if lower.contains("regulator") => ComponentType::VoltageRegulator,
        _ if lower.contains("sensor") => ComponentType::Sensor,
        _ if lower.contains("connector") => ComponentType::Connector,
        _ if lower.contains("switch") => ComponentType::Switch,
        _ => ComponentType::Other,
    }
}

/// Generic human-readable description for a symbol with none of its own.
pub fn describe(name: &str, component_type: ComponentType) -> String {
    if name.contains("Reverb") {
        return "Digital Reverberation Unit".to_string();
    }
    if name.contains("BTDR") {
        return "Belton Digital Reverb Module".to_string();
    }

    match component_type {
        ComponentType::Led => "LED".to_string(),
        ComponentType::Ic => "Integrated Circuit".to_string(),
        ComponentType::Audio => "Audio Component".to_string(),
        other => title_case(other.as_str()),
    }
}

fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_rules() {
        let keyword = ClassifierStrategy::Keyword;
        assert_eq!(keyword.classify("R_Small"), ComponentType::Resistor);
        assert_eq!(keyword.classify("C_Polarized"), ComponentType::Capacitor);
        assert_eq!(keyword.classify("D_Schottky"), ComponentType::Diode);
        assert_eq!(keyword.classify("LED_RGB"), ComponentType::Led);
        assert_eq!(keyword.classify("LED"), ComponentType::Led);
        assert_eq!(keyword.classify("Q_NPN_BCE"), ComponentType::Transistor);
        assert_eq!(keyword.classify("SW_Push"), ComponentType::Switch);
        assert_eq!(keyword.classify("Conn_01x02"), ComponentType::Connector);
        assert_eq!(keyword.classify("Fuse"), ComponentType::Fuse);
        assert_eq!(keyword.classify("GND"), ComponentType::Ground);
        assert_eq!(keyword.classify("LM7805"), ComponentType::Ic);
    }

    #[test]
    fn test_prefix_rules() {
        let prefix = ClassifierStrategy::Prefix;
        assert_eq!(prefix.classify("R_Small"), ComponentType::Resistor);
        assert_eq!(prefix.classify("D_LED_Small"), ComponentType::Led);
        assert_eq!(prefix.classify("D_Zener"), ComponentType::Diode);
        assert_eq!(prefix.classify("Speaker"), ComponentType::Audio);
        assert_eq!(prefix.classify("BTDR-1H_Reverb"), ComponentType::Reverb);
        assert_eq!(prefix.classify("U_Opamp"), ComponentType::Ic);
        assert_eq!(prefix.classify("LM7805_regulator"), ComponentType::Inductor);
        assert_eq!(prefix.classify("Xtal_Sensor"), ComponentType::Sensor);
        assert_eq!(prefix.classify("MCP1700_Regulator"), ComponentType::VoltageRegulator);
        assert_eq!(prefix.classify("Mystery"), ComponentType::Other);
        assert_eq!(prefix.classify(""), ComponentType::Other);
    }

    #[test]
    fn test_classification_is_stable() {
        for strategy in [ClassifierStrategy::Keyword, ClassifierStrategy::Prefix] {
            for name in ["R_Small", "LED_RGB", "Q_NPN", "nothing"] {
                assert_eq!(strategy.classify(name), strategy.classify(name));
            }
        }
    }

    #[test]
    fn test_electrical_defaults() {
        let r = ComponentType::Resistor.electrical_defaults().unwrap();
        assert_eq!(r.resistance, Some(1000.0));
        assert_eq!(r.voltage, None);
        assert_eq!(ComponentType::Led.electrical_defaults().unwrap().voltage, Some(0.7));
        assert_eq!(
            ComponentType::PowerSupply.electrical_defaults().unwrap().voltage,
            Some(5.0)
        );
        assert!(ComponentType::Ic.electrical_defaults().is_none());

        let json = serde_json::to_value(r).unwrap();
        assert_eq!(json, serde_json::json!({ "resistance": 1000.0 }));
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe("R_Small", ComponentType::Resistor), "Resistor");
        assert_eq!(describe("LED_RGB", ComponentType::Led), "LED");
        assert_eq!(describe("BTDR-1H_Reverb", ComponentType::Reverb), "Digital Reverberation Unit");
        assert_eq!(describe("BTDR-2H", ComponentType::Other), "Belton Digital Reverb Module");
        assert_eq!(describe("X", ComponentType::PowerSupply), "Power Supply");
        assert_eq!(describe("X", ComponentType::Ic), "Integrated Circuit");
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("prefix".parse::<ClassifierStrategy>(), Ok(ClassifierStrategy::Prefix));
        assert_eq!("Keyword".parse::<ClassifierStrategy>(), Ok(ClassifierStrategy::Keyword));
        assert!("fuzzy".parse::<ClassifierStrategy>().is_err());
        assert_eq!(ComponentType::VoltageRegulator.to_string(), "voltage_regulator");
    }
}
