use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::config::Credentials;

/// Process exit status used by `main` when the SDK rejects the configured
/// credentials.
pub const CREDENTIAL_EXIT_CODE: i32 = 3;

/// Credential inputs, resolved in precedence order: explicit key pair first,
/// then named profile, then the SDK default chain.
#[derive(Debug, Clone, Default)]
pub struct AwsCredentials {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub profile: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CredentialSource<'a> {
    Static {
        access_key: &'a str,
        secret_key: &'a str,
    },
    Profile(&'a str),
    DefaultChain,
}

impl AwsCredentials {
    pub fn source(&self) -> CredentialSource<'_> {
        match (&self.access_key, &self.secret_key) {
            (Some(access_key), Some(secret_key)) => CredentialSource::Static {
                access_key,
                secret_key,
            },
            _ => match &self.profile {
                Some(profile) => CredentialSource::Profile(profile),
                None => CredentialSource::DefaultChain,
            },
        }
    }
}

/// Build a region-scoped SDK config honoring the credential precedence.
pub async fn sdk_config(credentials: &AwsCredentials, region: &str) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));

    match credentials.source() {
        CredentialSource::Static {
            access_key,
            secret_key,
        } => {
            loader = loader.credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "floe-config",
            ));
        }
        CredentialSource::Profile(profile) => {
            loader = loader.profile_name(profile);
        }
        CredentialSource::DefaultChain => {}
    }

    loader.load().await
}

pub async fn s3_client(credentials: &AwsCredentials, region: &str) -> aws_sdk_s3::Client {
    aws_sdk_s3::Client::new(&sdk_config(credentials, region).await)
}

pub async fn ec2_client(credentials: &AwsCredentials, region: &str) -> aws_sdk_ec2::Client {
    aws_sdk_ec2::Client::new(&sdk_config(credentials, region).await)
}
