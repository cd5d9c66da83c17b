pub mod credential;
pub mod handler;
pub mod models;
pub mod upstream;

// Re-exports for external use (main.rs, OpenAPI, client, etc.)
pub use credential::{CredentialSource, SERVICE_TOKEN_HEADER, authenticate};
pub use handler::{create_removal_router, remove_background};
pub use models::{
    DEFAULT_IMAGE_TYPE, FALLBACK_FILE_NAME, RemovalResponse, RemovalResult, RemovalUpload, UploadedFile,
};
pub use upstream::UpstreamClient;
