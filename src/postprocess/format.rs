//! Numeric formatting of statistic columns: unit conversion, optional
//! percent-of-plot expression, then rounding.

use serde_json::{Number, Value};
use std::collections::BTreeMap;

use crate::config::{FormatConfig, ValueUnit};

/// Round to `decimal_places`; non-finite input yields null
pub fn round_value(value: f64, decimal_places: u32) -> Value {
    if !value.is_finite() {
        return Value::Null;
    }
    let scale = 10_f64.powi(decimal_places as i32);
    let rounded = (value * scale).round() / scale;
    Number::from_f64(rounded)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Format one row's statistic values in place
///
/// Area columns arrive in hectares. The total area column is converted to the
/// configured unit; the other area columns are converted too, or expressed as
/// a percentage of the total when `value_unit` is `percent`. A missing or zero
/// total yields null percentages. Every floating value is then rounded.
pub fn format_values(values: &mut BTreeMap<String, Value>, config: &FormatConfig) {
    let factor = config.area_unit.from_hectares_factor();
    let total_ha = values
        .get(&config.total_area_column)
        .and_then(Value::as_f64);

    for column in &config.area_columns {
        if *column == config.total_area_column {
            continue;
        }
        let Some(slot) = values.get_mut(column) else {
            continue;
        };
        let Some(area_ha) = slot.as_f64() else {
            continue;
        };

        *slot = match config.value_unit {
            ValueUnit::Absolute => float(area_ha * factor),
            ValueUnit::Percent => match total_ha {
                Some(total) if total != 0.0 => float(area_ha / total * 100.0),
                _ => Value::Null,
            },
        };
    }

    if let (Some(total), Some(slot)) = (total_ha, values.get_mut(&config.total_area_column)) {
        *slot = float(total * factor);
    }

    for value in values.values_mut() {
        if let Value::Number(number) = value {
            if number.is_f64() {
                if let Some(float) = number.as_f64() {
                    *value = round_value(float, config.decimal_places);
                }
            }
        }
    }
}

fn float(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
