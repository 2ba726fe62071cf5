//! External collaborators of the media library.
//!
//! Each collaborator is a trait with one production implementation and one
//! in-memory double:
//!
//! | Trait | Production | Double |
//! |---|---|---|
//! | [`IdentityProvider`](identity::IdentityProvider) | Cognito | [`MemoryIdentityProvider`](identity::MemoryIdentityProvider) |
//! | [`ObjectStorage`](storage::ObjectStorage) | S3 | [`MemoryObjectStorage`](storage::MemoryObjectStorage) |
//! | [`CdnSigner`](cdn::CdnSigner) | CloudFront canned policy | (pure, no double needed) |
//! | [`SearchIndex`](search::SearchIndex) | HTTP JSON | [`MemorySearchIndex`](search::MemorySearchIndex) |

pub mod cdn;
pub mod identity;
pub mod search;
pub mod storage;

/// Errors from collaborator calls.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote service answered with a non-2xx status.
    #[error("{service} API error ({status}): {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// An SDK call failed.
    #[error("{service} call failed: {message}")]
    Service {
        service: &'static str,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CloudError {
    pub fn service(service: &'static str, message: impl Into<String>) -> Self {
        Self::Service {
            service,
            message: message.into(),
        }
    }
}

/// Render an AWS SDK error with its full source chain.
pub(crate) fn sdk_error<E>(service: &'static str, err: E) -> CloudError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CloudError::service(
        service,
        aws_sdk_s3::error::DisplayErrorContext(err).to_string(),
    )
}
