//! Unit conversion for numeric fields
//!
//! Number fields may declare SI units (the stored form) and preferred IP
//! units. Conversion goes through a fixed table: every unit is an affine map
//! onto the SI base unit of its dimension.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::UnitError;

/// Unit system used when reading a quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// The stored units
    #[default]
    Si,
    /// Inch-pound units, when the field declares them
    Ip,
}

/// A number tagged with its units
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub units: String,
}

impl Quantity {
    pub fn new(value: f64, units: impl Into<String>) -> Self {
        Self {
            value,
            units: units.into(),
        }
    }

    /// Express this quantity in other units
    pub fn convert_to(&self, units: &str) -> Result<Quantity, UnitError> {
        convert(self.value, &self.units, units).map(|value| Quantity::new(value, units))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.units)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Dimensionless,
    Length,
    Area,
    Volume,
    Power,
    Energy,
    Temperature,
    TemperatureDifference,
    VolumeFlow,
    MassFlow,
    Pressure,
    Velocity,
    Conductance,
}

struct UnitDef {
    symbol: &'static str,
    dimension: Dimension,
    /// SI value = value * scale + offset
    scale: f64,
    offset: f64,
}

const fn unit(symbol: &'static str, dimension: Dimension, scale: f64) -> UnitDef {
    UnitDef {
        symbol,
        dimension,
        scale,
        offset: 0.0,
    }
}

const FT: f64 = 0.3048;
const BTU: f64 = 1055.055_852_62;

static UNITS: &[UnitDef] = &[
    unit("", Dimension::Dimensionless, 1.0),
    unit("m", Dimension::Length, 1.0),
    unit("cm", Dimension::Length, 0.01),
    unit("mm", Dimension::Length, 0.001),
    unit("ft", Dimension::Length, FT),
    unit("in", Dimension::Length, 0.0254),
    unit("m2", Dimension::Area, 1.0),
    unit("ft2", Dimension::Area, FT * FT),
    unit("m3", Dimension::Volume, 1.0),
    unit("ft3", Dimension::Volume, FT * FT * FT),
    unit("gal", Dimension::Volume, 0.003_785_411_784),
    unit("L", Dimension::Volume, 0.001),
    unit("W", Dimension::Power, 1.0),
    unit("kW", Dimension::Power, 1000.0),
    unit("Btu/h", Dimension::Power, BTU / 3600.0),
    unit("ton", Dimension::Power, 12000.0 * BTU / 3600.0),
    unit("J", Dimension::Energy, 1.0),
    unit("kJ", Dimension::Energy, 1000.0),
    unit("kWh", Dimension::Energy, 3.6e6),
    unit("Btu", Dimension::Energy, BTU),
    unit("kBtu", Dimension::Energy, 1000.0 * BTU),
    unit("therm", Dimension::Energy, 1.0e5 * BTU),
    UnitDef {
        symbol: "C",
        dimension: Dimension::Temperature,
        scale: 1.0,
        offset: 0.0,
    },
    UnitDef {
        symbol: "F",
        dimension: Dimension::Temperature,
        scale: 5.0 / 9.0,
        offset: -32.0 * 5.0 / 9.0,
    },
    UnitDef {
        symbol: "K",
        dimension: Dimension::Temperature,
        scale: 1.0,
        offset: -273.15,
    },
    unit("deltaC", Dimension::TemperatureDifference, 1.0),
    unit("deltaF", Dimension::TemperatureDifference, 5.0 / 9.0),
    unit("m3/s", Dimension::VolumeFlow, 1.0),
    unit("L/s", Dimension::VolumeFlow, 0.001),
    unit("cfm", Dimension::VolumeFlow, FT * FT * FT / 60.0),
    unit("gal/min", Dimension::VolumeFlow, 0.003_785_411_784 / 60.0),
    unit("kg/s", Dimension::MassFlow, 1.0),
    unit("lb/s", Dimension::MassFlow, 0.453_592_37),
    unit("Pa", Dimension::Pressure, 1.0),
    unit("kPa", Dimension::Pressure, 1000.0),
    unit("psi", Dimension::Pressure, 6894.757_293_168),
    unit("inH2O", Dimension::Pressure, 249.088_908_333),
    unit("m/s", Dimension::Velocity, 1.0),
    unit("ft/min", Dimension::Velocity, FT / 60.0),
    unit("W/m2-K", Dimension::Conductance, 1.0),
    unit("Btu/h-ft2-F", Dimension::Conductance, 5.678_263_34),
];

fn lookup(symbol: &str) -> Result<&'static UnitDef, UnitError> {
    let symbol = symbol.trim();
    UNITS
        .iter()
        .find(|u| u.symbol == symbol)
        .or_else(|| UNITS.iter().find(|u| u.symbol.eq_ignore_ascii_case(symbol)))
        .ok_or_else(|| UnitError::UnknownUnit(symbol.to_string()))
}

/// Whether `symbol` is a known unit
pub fn is_known_unit(symbol: &str) -> bool {
    lookup(symbol).is_ok()
}

/// Convert `value` from one unit to another of the same dimension
pub fn convert(value: f64, from: &str, to: &str) -> Result<f64, UnitError> {
    let source = lookup(from)?;
    let target = lookup(to)?;
    if source.dimension != target.dimension {
        return Err(UnitError::Incompatible {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    if source.symbol == target.symbol {
        return Ok(value);
    }
    let si = value * source.scale + source.offset;
    Ok((si - target.offset) / target.scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6 * b.abs().max(1.0)
    }

    #[test]
    fn test_length_and_area() {
        assert!(close(convert(1.0, "ft", "m").unwrap(), 0.3048));
        assert!(close(convert(1.0, "m2", "ft2").unwrap(), 10.763_910_4));
    }

    #[test]
    fn test_temperature() {
        assert!(close(convert(212.0, "F", "C").unwrap(), 100.0));
        assert!(close(convert(0.0, "C", "F").unwrap(), 32.0));
        assert!(close(convert(0.0, "C", "K").unwrap(), 273.15));
        assert!(close(convert(9.0, "deltaF", "deltaC").unwrap(), 5.0));
    }

    #[test]
    fn test_flow_and_power() {
        assert!(close(convert(1.0, "m3/s", "cfm").unwrap(), 2118.880));
        assert!(close(convert(1.0, "ton", "W").unwrap(), 3516.852_842));
    }

    #[test]
    fn test_incompatible_and_unknown() {
        assert_eq!(
            convert(1.0, "m", "W"),
            Err(UnitError::Incompatible {
                from: "m".to_string(),
                to: "W".to_string()
            })
        );
        assert_eq!(
            convert(1.0, "furlong", "m"),
            Err(UnitError::UnknownUnit("furlong".to_string()))
        );
    }

    #[test]
    fn test_quantity_convert_to() {
        let q = Quantity::new(10.0, "m");
        let ft = q.convert_to("ft").unwrap();
        assert_eq!(ft.units, "ft");
        assert!(close(ft.value, 32.808_399));
        assert_eq!(format!("{}", Quantity::new(2.5, "W")), "2.5 W");
    }
}
