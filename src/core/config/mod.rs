pub mod defaults;
pub mod paths;
pub mod service;
pub mod settings;

pub use paths::AppPaths;
pub use service::ConfigService;
pub use settings::Settings;
