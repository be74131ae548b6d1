pub use hoist_core::*;

#[cfg(feature = "client")]
pub mod client {
    pub use hoist_client::*;
}

#[cfg(feature = "s3")]
pub mod s3 {
    pub use hoist_s3::*;
}

#[cfg(feature = "fs")]
pub mod fs {
    pub use hoist_fs::*;
}

#[cfg(feature = "mock")]
pub mod mock {
    pub use hoist_mock::*;
}

pub mod prelude {
    pub use hoist_core::prelude::*;

    #[cfg(feature = "client")]
    pub use hoist_client::TokenApiClient;

    #[cfg(feature = "s3")]
    pub use hoist_s3::S3Storage;

    #[cfg(feature = "fs")]
    pub use hoist_fs::FileSystemStorage;

    #[cfg(feature = "mock")]
    pub use hoist_mock::{MemoryStorage, StaticCredentials};
}
