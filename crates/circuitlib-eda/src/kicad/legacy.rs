//! Reader for pre-S-expression KiCad symbol libraries (`.lib`).
//!
//! The legacy format is line oriented:
//!
//! ```text
//! EESchema-LIBRARY Version 2.4
//! DEF R R 0 0 N Y 1 F N
//! F0 "R" 30 0 50 V V C CNN
//! F1 "R" 0 0 50 V V C CNN
//! DRAW
//! S -40 -100 40 100 0 1 10 N
//! X ~ 1 0 150 50 D 50 50 1 1 P
//! ENDDRAW
//! ENDDEF
//! ```
//!
//! Coordinates are in mils and are converted to millimetres here so legacy
//! symbols share the coordinate space of `.kicad_sym` symbols.

use super::symbol::{closed_rectangle, RawSymbol};
use crate::{EdaError, PathCommand, Pin, PinType, SymbolPinType};

const MM_PER_MIL: f64 = 0.0254;

pub fn parse_legacy_library(content: &str, library: &str) -> Result<Vec<RawSymbol>, EdaError> {
    let mut lines = content.lines().map(str::trim);
    if !lines
        .next()
        .is_some_and(|header| header.starts_with("EESchema-LIBRARY"))
    {
        return Err(EdaError::NotLegacyLibrary);
    }

    let mut symbols = Vec::new();
    let mut current: Option<RawSymbol> = None;
    let mut aliases: Vec<String> = Vec::new();

    for line in lines {
        let fields = split_fields(line);
        let Some(record) = fields.first().map(String::as_str) else {
            continue;
        };

        if record == "DEF" {
            if let Some(name) = fields.get(1) {
                if let Some(unterminated) = current.take() {
                    log::warn!(
                        "Symbol '{}' in {library} is missing ENDDEF before the next DEF, keeping what was read",
                        unterminated.name
                    );
                    symbols.push(unterminated);
                }
                current = Some(RawSymbol::new(name.trim_start_matches('~'), library));
                aliases.clear();
            }
            continue;
        }

        let Some(symbol) = current.as_mut() else {
            continue;
        };

        match record {
            "F1" => set_field(symbol, "Value", fields.get(1)),
            "F2" => set_field(symbol, "Footprint", fields.get(1)),
            "F3" => set_field(symbol, "Datasheet", fields.get(1)),
            "F0" => set_field(symbol, "Reference", fields.get(1)),
            "ALIAS" => aliases.extend(fields[1..].iter().cloned()),
            "X" => match parse_pin(&fields) {
                Some(pin) => symbol.pins.push(pin),
                None => log::trace!("Skipping malformed pin in {}: {line}", symbol.name),
            },
            "S" => {
                if let Some(rect) = parse_rectangle(&fields) {
                    symbol.graphics.extend(rect);
                }
            }
            "P" => symbol.graphics.extend(parse_polyline(&fields)),
            "ENDDEF" => {
                if let Some(done) = current.take() {
                    let copies: Vec<RawSymbol> = aliases
                        .drain(..)
                        .map(|alias| {
                            let mut copy = done.clone();
                            copy.name = alias.clone();
                            copy.set_property("Value", &alias);
                            copy
                        })
                        .collect();
                    symbols.push(done);
                    symbols.extend(copies);
                }
            }
            _ => {}
        }
    }

    if let Some(unterminated) = current {
        log::warn!(
            "Symbol '{}' in {library} is missing ENDDEF, keeping what was read",
            unterminated.name
        );
        symbols.push(unterminated);
    }

    log::debug!("Parsed {} legacy symbols from {library}", symbols.len());
    Ok(symbols)
}

fn set_field(symbol: &mut RawSymbol, key: &str, value: Option<&String>) {
    if let Some(value) = value {
        symbol.set_property(key, value);
    }
}

// X name number posx posy length orientation Snum Snom unit convert Etype [shape]
fn parse_pin(fields: &[String]) -> Option<Pin> {
    let x = mils(fields.get(3)?)?;
    let y = mils(fields.get(4)?)?;
    let electrical = match fields.get(11)?.as_str() {
        "W" => "power_in",
        "w" => "power_out",
        "I" => "input",
        "O" => "output",
        "B" => "bidirectional",
        "T" => "tri_state",
        "P" => "passive",
        "C" => "open_collector",
        "E" => "open_emitter",
        "N" => "no_connect",
        _ => "unspecified",
    };

    Some(Pin {
        x,
        y,
        pin_type: PinType::Symbol(SymbolPinType::from_electrical(electrical)),
        number: fields.get(2).cloned(),
        name: fields.get(1).cloned(),
    })
}

// S startx starty endx endy unit convert thickness fill
fn parse_rectangle(fields: &[String]) -> Option<Vec<PathCommand>> {
    let start = (mils(fields.get(1)?)?, mils(fields.get(2)?)?);
    let end = (mils(fields.get(3)?)?, mils(fields.get(4)?)?);
    Some(closed_rectangle(start, end))
}

// P count unit convert thickness x1 y1 x2 y2 ... fill
fn parse_polyline(fields: &[String]) -> Vec<PathCommand> {
    let count: usize = fields.get(1).and_then(|c| c.parse().ok()).unwrap_or(0);
    let coords: Vec<f64> = fields
        .iter()
        .skip(5)
        .take(count * 2)
        .map_while(|f| mils(f))
        .collect();

    coords
        .chunks_exact(2)
        .enumerate()
        .map(|(i, xy)| {
            if i == 0 {
                PathCommand::MoveTo(xy[0], xy[1])
            } else {
                PathCommand::LineTo(xy[0], xy[1])
            }
        })
        .collect()
}

fn mils(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().map(|v| v * MM_PER_MIL)
}

/// Whitespace split that keeps quoted fields together, without the quotes.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                if quoted {
                    fields.push(std::mem::take(&mut current));
                }
                quoted = !quoted;
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    fields.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        fields.push(current);
    }
    fields
}
