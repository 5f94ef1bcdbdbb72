//! Database repositories for each table.

pub mod activity;
pub mod profile;
pub mod settings;

pub use activity::ActivityRepo;
pub use profile::ProfileRepo;
pub use settings::SettingsRepo;
