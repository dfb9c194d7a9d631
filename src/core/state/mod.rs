pub mod settings;

pub use settings::{settings_path, Settings};
