pub mod client;
pub mod flow_logs;
pub mod s3;

use aws_sdk_s3::error::ProvideErrorMetadata;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AwsError {
    /// The SDK rejected the configured credentials. Fatal to the run: a bad
    /// client would otherwise return empty listings for a whole region.
    #[error("invalid AWS credentials: {0}")]
    Credentials(String),

    #[error("AWS API error: {0}")]
    Api(String),

    #[error("object body error: {0}")]
    Body(String),

    #[error("decompression error: {0}")]
    Decompress(#[from] std::io::Error),
}

/// Error codes AWS returns for rejected or malformed credentials.
const CREDENTIAL_ERROR_CODES: &[&str] = &[
    "AuthFailure",
    "UnrecognizedClientException",
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "AccessDenied",
    "AccessDeniedException",
];

/// Map an SDK error to the taxonomy: credential rejections become the fatal
/// `Credentials` variant, everything else stays a skippable `Api` error.
pub(crate) fn classify_sdk_error<E, R>(err: aws_sdk_s3::error::SdkError<E, R>) -> AwsError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match &err {
        aws_sdk_s3::error::SdkError::ServiceError(ctx) => {
            if let Some(code) = ctx.err().code() {
                if CREDENTIAL_ERROR_CODES.contains(&code) {
                    let message = ctx.err().message().unwrap_or("credentials rejected");
                    return AwsError::Credentials(format!("{}: {}", code, message));
                }
            }
        }
        // A request that never left the client because no credentials could
        // be resolved surfaces as a dispatch failure, not a service error.
        aws_sdk_s3::error::SdkError::DispatchFailure(_) => {
            let text = format!("{}", aws_sdk_s3::error::DisplayErrorContext(&err));
            if text.contains("credential") {
                return AwsError::Credentials(text);
            }
        }
        _ => {}
    }
    AwsError::Api(format!("{}", aws_sdk_s3::error::DisplayErrorContext(&err)))
}
