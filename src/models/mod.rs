pub mod config;
pub mod export_format;
pub mod profile;
pub mod profile_set;
pub mod timestamp;

pub use config::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use export_format::{ExportFormat, ShellType, DEFAULT_PREFIX};
pub use profile::{AuthMethod, Credential, Profile, ProfileRecord};
pub use profile_set::{
    ProfileSet, ProfileSetDocument, CURRENT_CONFIG_VERSION, SUPPORTED_CONFIG_VERSIONS,
};
