use regex::Regex;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    str::FromStr,
    sync::LazyLock,
};

// <https://docs.aws.amazon.com/general/latest/gr/rande.html#regional-endpoints>
static AWS_REGION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]?)?-[a-z]+-\d{1,2}$").ok());

pub const DEFAULT_REGION: &str = "us-east-1";

/// Where requests are sent and which region name is used to sign them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    /// AWS region, path style `s3.<name>.amazonaws.com`
    Aws(String),

    /// Custom region, endpoint (`MinIO`, Ceph, R2, ...)
    Custom { name: String, endpoint: String },
}

impl Region {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Aws(name) => name,
            Self::Custom { name, .. } if name.is_empty() => DEFAULT_REGION,
            Self::Custom { name, .. } => name,
        }
    }

    /// Endpoint including the scheme, `https` unless the custom endpoint says
    /// otherwise.
    #[must_use]
    pub fn endpoint(&self) -> String {
        match self {
            Self::Aws(name) => format!("https://s3.{name}.amazonaws.com"),
            Self::Custom { endpoint, .. } => {
                let endpoint = endpoint.trim_end_matches('/');
                if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                    endpoint.to_string()
                } else {
                    format!("https://{endpoint}")
                }
            }
        }
    }

    /// Region from `AWS_REGION` or `AWS_DEFAULT_REGION`, `us-east-1` otherwise.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var("AWS_REGION")
            .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| Self::Aws(DEFAULT_REGION.to_string()))
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.endpoint())
    }
}

impl FromStr for Region {
    type Err = ParseRegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        match AWS_REGION.as_ref() {
            Some(re) if re.is_match(&name) => Ok(Self::Aws(name)),
            _ => Err(ParseRegionError::new(s)),
        }
    }
}

/// An error produced when attempting to convert a `str` into a `Region` fails.
#[derive(Debug, PartialEq, Eq)]
pub struct ParseRegionError {
    message: String,
}

impl ParseRegionError {
    #[must_use]
    pub fn new(input: &str) -> Self {
        Self {
            message: format!("Not a valid AWS region: {input}"),
        }
    }
}

impl Error for ParseRegionError {}

impl Display for ParseRegionError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(
            "foo"
                .parse::<Region>()
                .expect_err("Parsing foo as a Region was not an error")
                .to_string(),
            "Not a valid AWS region: foo".to_owned()
        );

        for name in [
            "af-south-1",
            "ap-northeast-3",
            "eu-central-2",
            "us-gov-west-1",
            "US-WEST-2",
        ] {
            let region = name.parse::<Region>().unwrap();
            assert_eq!(region.name(), name.to_lowercase());
        }
    }

    #[test]
    fn test_endpoint() {
        let region = "eu-west-1".parse::<Region>().unwrap();
        assert_eq!(region.endpoint(), "https://s3.eu-west-1.amazonaws.com");

        let custom = Region::Custom {
            name: String::new(),
            endpoint: "minio.example.com/".to_string(),
        };
        assert_eq!(custom.endpoint(), "https://minio.example.com");
        assert_eq!(custom.name(), DEFAULT_REGION);

        let local = Region::Custom {
            name: "local".to_string(),
            endpoint: "http://127.0.0.1:9000".to_string(),
        };
        assert_eq!(local.endpoint(), "http://127.0.0.1:9000");
        assert_eq!(local.name(), "local");
    }

    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                ("AWS_REGION", Some("ap-south-1")),
                ("AWS_DEFAULT_REGION", None::<&str>),
            ],
            || {
                assert_eq!(Region::from_env(), Region::Aws("ap-south-1".to_string()));
            },
        );

        temp_env::with_vars(
            [
                ("AWS_REGION", None::<&str>),
                ("AWS_DEFAULT_REGION", Some("not a region")),
            ],
            || {
                assert_eq!(Region::from_env(), Region::Aws(DEFAULT_REGION.to_string()));
            },
        );
    }
}
