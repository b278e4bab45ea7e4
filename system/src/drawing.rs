use euclid::default::Point2D;
use serde_json::{Map, Value};
use std::fmt;

/// One line segment drawn by a participant.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeEvent {
    pub from: Point2D<f64>,
    pub to: Point2D<f64>,
    /// Not bounds-checked. Zero or negative values are relayed as sent.
    pub thickness: f64,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidDrawing {
    NotAnObject,
    MissingField(&'static str),
    WrongType(&'static str),
}

impl fmt::Display for InvalidDrawing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "drawing payload is not an object"),
            Self::MissingField(key) => write!(f, "drawing payload has no `{}`", key),
            Self::WrongType(key) => write!(f, "drawing payload has a mistyped `{}`", key),
        }
    }
}

impl std::error::Error for InvalidDrawing {}

/// Shape check for an inbound `drawing` payload.
///
/// Only the presence and JSON type of each field is checked. The payload itself is what gets
/// relayed, so fields beyond these are allowed and passed along.
pub fn validate_drawing(payload: &Value) -> Result<StrokeEvent, InvalidDrawing> {
    let fields = payload.as_object().ok_or(InvalidDrawing::NotAnObject)?;
    Ok(StrokeEvent {
        from: Point2D::new(number(fields, "x0")?, number(fields, "y0")?),
        to: Point2D::new(number(fields, "x1")?, number(fields, "y1")?),
        thickness: number(fields, "thickness")?,
        user_id: string(fields, "userId")?.to_owned(),
    })
}

fn field<'a>(fields: &'a Map<String, Value>, key: &'static str) -> Result<&'a Value, InvalidDrawing> {
    fields.get(key).ok_or(InvalidDrawing::MissingField(key))
}

fn number(fields: &Map<String, Value>, key: &'static str) -> Result<f64, InvalidDrawing> {
    field(fields, key)?
        .as_f64()
        .ok_or(InvalidDrawing::WrongType(key))
}

fn string<'a>(fields: &'a Map<String, Value>, key: &'static str) -> Result<&'a str, InvalidDrawing> {
    field(fields, key)?
        .as_str()
        .ok_or(InvalidDrawing::WrongType(key))
}
