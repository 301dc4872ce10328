pub mod constants;
pub mod state;

pub use state::{CheckKind, CheckState};
