//! Live edit-form state: value coercion, debounced validation, and the
//! array, entity reference and geo editing helpers built on top of it.

mod anet;
mod coerce;
mod debounce;
pub(crate) mod geo;
mod session;

pub use anet::{EntityRef, collection_for};
pub use coerce::{ChangeHandler, Coercion, RawInput, ValidationTrigger};
pub use debounce::Debouncer;
pub use geo::{
    CoordinateFormat, GeoEdit, LATITUDE_ERROR, LONGITUDE_ERROR, LatLngFormat, display_coordinate,
};
pub use session::FormSession;
