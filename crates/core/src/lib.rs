pub mod coords;
pub mod submission;

pub use coords::{CoordinateError, Coordinates};
pub use submission::{AnimalSubmission, ValidationError};
