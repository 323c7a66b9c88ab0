use std::fmt;

use serde_json::{Map, Value};

pub const LATITUDE_ERROR: &str = "Latitude must be a number between -90 and +90";
pub const LONGITUDE_ERROR: &str = "Longitude must be a number between -180 and +180";

/// Display format of a geo location, kept next to the canonical lat/lng pair
/// under `displayedCoordinate`.
pub trait CoordinateFormat: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn format(&self, lat: f64, lng: f64) -> String;
    fn parse(&self, text: &str) -> Option<(f64, f64)>;
}

/// `"lat, lng"` in decimal degrees.
#[derive(Debug, Clone)]
pub struct LatLngFormat {
    pub precision: usize,
}

impl Default for LatLngFormat {
    fn default() -> Self {
        Self { precision: 6 }
    }
}

impl CoordinateFormat for LatLngFormat {
    fn name(&self) -> &str {
        "LAT_LON"
    }

    fn format(&self, lat: f64, lng: f64) -> String {
        format!(
            "{}, {}",
            trim_decimal(format!("{lat:.*}", self.precision)),
            trim_decimal(format!("{lng:.*}", self.precision))
        )
    }

    fn parse(&self, text: &str) -> Option<(f64, f64)> {
        let mut parts = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty());
        let lat = parts.next()?.parse::<f64>().ok()?;
        let lng = parts.next()?.parse::<f64>().ok()?;
        if parts.next().is_some() || !valid_lat(lat) || !valid_lng(lng) {
            return None;
        }
        Some((lat, lng))
    }
}

fn trim_decimal(text: String) -> String {
    if !text.contains('.') {
        return text;
    }
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub(crate) fn valid_lat(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat)
}

pub(crate) fn valid_lng(lng: f64) -> bool {
    (-180.0..=180.0).contains(&lng)
}

/// An edit of a geo location field: either side may be entered, the other
/// one is recomputed from it.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoEdit {
    LatLng { lat: Option<f64>, lng: Option<f64> },
    Displayed(String),
}

/// Numeric coordinate stored in a geo value; numeric strings are accepted.
pub(crate) fn coordinate(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Displayed coordinate of a stored geo value: the persisted text when there
/// is one, otherwise formatted from lat/lng.
pub fn display_coordinate(value: &Value, format: &dyn CoordinateFormat) -> Option<String> {
    if let Some(text) = value.get("displayedCoordinate").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return Some(text.to_string());
        }
    }
    let lat = coordinate(value.get("lat"))?;
    let lng = coordinate(value.get("lng"))?;
    Some(format.format(lat, lng))
}

pub(crate) fn apply_geo_edit(
    current: Option<&Value>,
    edit: GeoEdit,
    format: &dyn CoordinateFormat,
) -> Value {
    let mut object = match current {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    let (lat, lng, displayed) = match edit {
        GeoEdit::LatLng { lat, lng } => {
            // non-finite components cannot be stored, so they are not displayed either
            let lat = lat.filter(|lat| lat.is_finite());
            let lng = lng.filter(|lng| lng.is_finite());
            let displayed = match (lat, lng) {
                (Some(lat), Some(lng)) => format.format(lat, lng),
                _ => String::new(),
            };
            (lat, lng, displayed)
        }
        GeoEdit::Displayed(text) => match format.parse(&text) {
            Some((lat, lng)) => (Some(lat), Some(lng), text),
            None => (None, None, text),
        },
    };
    object.insert("lat".to_string(), number_or_null(lat));
    object.insert("lng".to_string(), number_or_null(lng));
    object.insert("displayedCoordinate".to_string(), Value::String(displayed));
    Value::Object(object)
}

fn number_or_null(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lat_lng_format_round_trips() {
        let format = LatLngFormat::default();
        assert_eq!(format.format(12.5, -3.25), "12.5, -3.25");
        assert_eq!(format.parse("12.5, -3.25"), Some((12.5, -3.25)));
        assert_eq!(format.parse("95, 0"), None);
        assert_eq!(format.parse("north"), None);
    }

    #[test]
    fn editing_lat_lng_recomputes_display() {
        let value = apply_geo_edit(
            Some(&json!({"lat": 1, "lng": 2, "displayedCoordinate": "1, 2", "note": "x"})),
            GeoEdit::LatLng {
                lat: Some(10.0),
                lng: Some(20.0),
            },
            &LatLngFormat::default(),
        );
        assert_eq!(
            value,
            json!({"lat": 10.0, "lng": 20.0, "displayedCoordinate": "10, 20", "note": "x"})
        );
    }

    #[test]
    fn non_finite_components_are_neither_stored_nor_displayed() {
        let format = LatLngFormat::default();
        let value = apply_geo_edit(
            None,
            GeoEdit::LatLng {
                lat: Some(f64::NAN),
                lng: Some(20.0),
            },
            &format,
        );
        assert_eq!(
            value,
            json!({"lat": null, "lng": 20.0, "displayedCoordinate": ""})
        );

        let value = apply_geo_edit(
            None,
            GeoEdit::LatLng {
                lat: Some(95.0),
                lng: Some(f64::INFINITY),
            },
            &format,
        );
        assert_eq!(
            value,
            json!({"lat": 95.0, "lng": null, "displayedCoordinate": ""})
        );

        let value = apply_geo_edit(
            None,
            GeoEdit::LatLng {
                lat: Some(95.0),
                lng: Some(20.0),
            },
            &format,
        );
        assert_eq!(value["lat"], json!(95.0));
        assert_eq!(value["displayedCoordinate"], json!("95, 20"));
    }

    #[test]
    fn editing_display_recomputes_lat_lng() {
        let format = LatLngFormat::default();
        let value = apply_geo_edit(None, GeoEdit::Displayed("5, 6".into()), &format);
        assert_eq!(value["lat"], json!(5.0));
        assert_eq!(value["lng"], json!(6.0));

        let value = apply_geo_edit(Some(&value), GeoEdit::Displayed("nowhere".into()), &format);
        assert_eq!(value["lat"], Value::Null);
        assert_eq!(value["displayedCoordinate"], json!("nowhere"));
    }
}
