pub mod config;
pub mod learner;
pub mod session;

pub use config::{load_config, Config, ConfigError};
pub use learner::{
    apply_correction, apply_corrections, Correction, CorrectionError, CorrectionReport,
};
pub use session::{Session, SessionError};
