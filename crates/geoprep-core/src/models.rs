pub mod crs;
pub mod path;

pub use crs::Crs;
pub use path::CoordinatePath;
