use crate::ui::icons;
use anyhow::Result;
use circuitlib_eda::{describe, ClassifierStrategy, ElectricalDefaults};
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
#[command(about = "Classify symbol names the way a catalog build would")]
pub struct ClassifyArgs {
    /// Symbol names, e.g. R_Small LED_RGB Q_NPN_BCE
    #[arg(value_name = "NAME", required = true)]
    pub names: Vec<String>,

    /// Name classification strategy
    #[arg(long, value_name = "STRATEGY", default_value_t = ClassifierStrategy::Keyword)]
    pub classifier: ClassifierStrategy,

    /// Print one JSON object per line
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: ClassifyArgs) -> Result<()> {
    for name in &args.names {
        let component_type = args.classifier.classify(name);
        let description = describe(name, component_type);
        let defaults = component_type.electrical_defaults();

        if args.json {
            let line = serde_json::json!({
                "name": name,
                "type": component_type,
                "description": description,
                "electricalDefaults": defaults,
            });
            println!("{line}");
        } else {
            println!(
                "{} {} {} ({}){}",
                name.bold(),
                icons::arrow(),
                component_type.as_str().cyan(),
                description,
                format_defaults(defaults)
            );
        }
    }
    Ok(())
}

fn format_defaults(defaults: Option<ElectricalDefaults>) -> String {
    let Some(d) = defaults else {
        return String::new();
    };
    let parts: Vec<String> = [
        d.resistance.map(|v| format!("{v} Ω")),
        d.capacitance.map(|v| format!("{v} F")),
        d.inductance.map(|v| format!("{v} H")),
        d.voltage.map(|v| format!("{v} V")),
    ]
    .into_iter()
    .flatten()
    .collect();
    format!(" [{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuitlib_eda::ComponentType;

    #[test]
    fn test_format_defaults() {
        assert_eq!(format_defaults(ComponentType::Resistor.electrical_defaults()), " [1000 Ω]");
        assert_eq!(format_defaults(ComponentType::Led.electrical_defaults()), " [0.7 V]");
        assert_eq!(format_defaults(None), "");
    }
}
