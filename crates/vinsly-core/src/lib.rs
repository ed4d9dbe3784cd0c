pub mod agent;
pub mod bundle;
pub mod config;
pub mod discovery;
pub mod error;
pub mod frontmatter;
pub mod fuzzy;
pub mod io;
pub mod keycase;
pub mod paths;
pub mod scanner;
pub mod skills;
pub mod store;
pub mod types;

pub use error::{Result, VinslyError};
