pub mod geojson;
pub mod records;

pub use self::geojson::*;
pub use records::*;
