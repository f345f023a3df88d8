pub mod names;
pub mod regression;
pub mod roles;
pub mod script;

pub use regression::configure;
pub use roles::{Advisory, RolePairError};
pub use script::ScriptGenerator;
