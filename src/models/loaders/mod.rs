pub mod character_loader;

pub use character_loader::{load_characters_from_file, parse_characters};
