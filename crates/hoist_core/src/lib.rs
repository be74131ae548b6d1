pub mod assets;
pub mod checksum;
pub mod config;
pub mod error;
pub mod manifest;
pub mod platform;
pub mod publish;
pub mod reporter;
pub mod traits;

pub mod prelude {
    pub use super::assets::*;
    pub use super::checksum::*;
    pub use super::config::*;
    pub use super::error::*;
    pub use super::manifest::*;
    pub use super::platform::*;
    pub use super::publish::*;
    pub use super::reporter::*;
    pub use super::traits::*;
}
