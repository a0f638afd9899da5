pub mod loader;
pub mod repository;

pub use loader::{DatasetLoader, DatasetRow, DATASET_LIMIT};
pub use repository::{
    Accident, AccidentRepository, InMemoryAccidentRepository, LmdbAccidentRepository, NewAccident,
};
