//! Azure Storage connection strings and Shared Key request signing.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use time::{OffsetDateTime, UtcOffset, macros::format_description};
use url::Url;

/// Blob REST API version sent with every request.
pub(crate) const API_VERSION: &str = "2021-08-06";

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";
const DEVELOPMENT_ACCOUNT: &str = "devstoreaccount1";
const DEVELOPMENT_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";
// Published Azurite/emulator key; not a secret.
const DEVELOPMENT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("connection string is empty")]
    Empty,
    #[error("malformed connection string segment `{0}`")]
    Malformed(String),
    #[error("connection string names neither BlobEndpoint nor AccountName")]
    MissingEndpoint,
    #[error("invalid blob endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("account key is not valid base64")]
    InvalidAccountKey,
}

/// How requests to the blob service are authorised.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    SharedKey { account: String, key: Vec<u8> },
    Sas(String),
    Anonymous,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::SharedKey { account, .. } => f
                .debug_struct("SharedKey")
                .field("account", account)
                .finish_non_exhaustive(),
            Credential::Sas(_) => f.write_str("Sas(..)"),
            Credential::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// Blob service endpoint and credential resolved from a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobAccount {
    pub endpoint: Url,
    pub credential: Credential,
}

impl BlobAccount {
    /// Parse a `Key=Value;Key=Value` Azure Storage connection string.
    ///
    /// Supports `BlobEndpoint`, `DefaultEndpointsProtocol` + `AccountName` +
    /// `EndpointSuffix`, `AccountKey`, `SharedAccessSignature` and
    /// `UseDevelopmentStorage=true`.
    pub fn parse(connection_string: &str) -> Result<Self, ConnectionError> {
        let trimmed = connection_string.trim();
        if trimmed.is_empty() {
            return Err(ConnectionError::Empty);
        }

        let mut fields: HashMap<String, String> = HashMap::new();
        for segment in trimmed.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((key, value)) = segment.split_once('=') else {
                return Err(ConnectionError::Malformed(segment.to_string()));
            };
            fields.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        if fields
            .get("usedevelopmentstorage")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
        {
            return Self::development();
        }

        let endpoint = match fields.get("blobendpoint") {
            Some(endpoint) => parse_endpoint(endpoint)?,
            None => {
                let account = fields
                    .get("accountname")
                    .ok_or(ConnectionError::MissingEndpoint)?;
                let protocol = fields
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_PROTOCOL);
                let suffix = fields
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_ENDPOINT_SUFFIX);
                parse_endpoint(&format!("{protocol}://{account}.blob.{suffix}"))?
            }
        };

        let credential = if let Some(sas) = fields.get("sharedaccesssignature") {
            Credential::Sas(sas.trim_start_matches('?').to_string())
        } else if let (Some(account), Some(key)) =
            (fields.get("accountname"), fields.get("accountkey"))
        {
            Credential::SharedKey {
                account: account.clone(),
                key: STANDARD
                    .decode(key)
                    .map_err(|_| ConnectionError::InvalidAccountKey)?,
            }
        } else {
            Credential::Anonymous
        };

        Ok(Self {
            endpoint,
            credential,
        })
    }

    fn development() -> Result<Self, ConnectionError> {
        Ok(Self {
            endpoint: parse_endpoint(DEVELOPMENT_ENDPOINT)?,
            credential: Credential::SharedKey {
                account: DEVELOPMENT_ACCOUNT.to_string(),
                key: STANDARD
                    .decode(DEVELOPMENT_KEY)
                    .map_err(|_| ConnectionError::InvalidAccountKey)?,
            },
        })
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ConnectionError> {
    let invalid = |reason: String| ConnectionError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };
    let url = Url::parse(endpoint).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https".to_string()));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("endpoint cannot carry a path".to_string()));
    }
    Ok(url)
}

/// Format a timestamp the way `x-ms-date` expects (RFC 1123, GMT).
pub(crate) fn ms_date(now: OffsetDateTime) -> Result<String, time::error::Format> {
    now.to_offset(UtcOffset::UTC).format(format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    ))
}

/// Build the Shared Key string-to-sign for a body-less request.
///
/// `ms_headers` are the `x-ms-*` headers sent with the request, keyed by lowercase name.
pub(crate) fn string_to_sign(
    method: &str,
    url: &Url,
    account: &str,
    ms_headers: &BTreeMap<String, String>,
) -> String {
    // Content-Encoding through Range are all empty for GET without a body.
    let mut out = format!("{method}\n{}", "\n".repeat(11));

    for (name, value) in ms_headers {
        out.push_str(name);
        out.push(':');
        out.push_str(value.trim());
        out.push('\n');
    }

    out.push('/');
    out.push_str(account);
    out.push_str(url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    for (name, mut values) in params {
        values.sort();
        out.push('\n');
        out.push_str(&name);
        out.push(':');
        out.push_str(&values.join(","));
    }

    out
}

/// Base64 HMAC-SHA256 of `string_to_sign` under the decoded account key.
pub(crate) fn shared_key_signature(
    key: &[u8],
    string_to_sign: &str,
) -> Result<String, hmac::digest::InvalidLength> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn parses_account_key_connection_string() {
        let account = BlobAccount::parse(
            "DefaultEndpointsProtocol=https;AccountName=bulletin;AccountKey=c2VjcmV0;EndpointSuffix=core.windows.net",
        )
        .expect("valid connection string");

        assert_eq!(account.endpoint.as_str(), "https://bulletin.blob.core.windows.net/");
        assert_eq!(
            account.credential,
            Credential::SharedKey {
                account: "bulletin".to_string(),
                key: b"secret".to_vec(),
            }
        );
    }

    #[test]
    fn blob_endpoint_with_sas_takes_precedence() {
        let account = BlobAccount::parse(
            "BlobEndpoint=http://127.0.0.1:9000/acct;SharedAccessSignature=?sv=2021-08-06&sig=abc;",
        )
        .expect("valid connection string");

        assert_eq!(account.endpoint.as_str(), "http://127.0.0.1:9000/acct");
        assert_eq!(
            account.credential,
            Credential::Sas("sv=2021-08-06&sig=abc".to_string())
        );
    }

    #[test]
    fn development_storage_points_at_emulator() {
        let account =
            BlobAccount::parse("UseDevelopmentStorage=true").expect("development storage");
        assert_eq!(
            account.endpoint.as_str(),
            "http://127.0.0.1:10000/devstoreaccount1"
        );
        assert!(matches!(account.credential, Credential::SharedKey { .. }));
    }

    #[test]
    fn rejects_invalid_connection_strings() {
        assert_eq!(BlobAccount::parse("  "), Err(ConnectionError::Empty));
        assert_eq!(
            BlobAccount::parse("not-a-connection-string"),
            Err(ConnectionError::Malformed("not-a-connection-string".to_string()))
        );
        assert_eq!(
            BlobAccount::parse("AccountKey=c2VjcmV0"),
            Err(ConnectionError::MissingEndpoint)
        );
        assert_eq!(
            BlobAccount::parse("AccountName=a;AccountKey=***"),
            Err(ConnectionError::InvalidAccountKey)
        );
        assert!(matches!(
            BlobAccount::parse("BlobEndpoint=ftp://example.com"),
            Err(ConnectionError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let credential = Credential::Sas("sig=topsecret".to_string());
        assert!(!format!("{credential:?}").contains("topsecret"));
    }

    #[test]
    fn formats_ms_date_in_gmt() {
        let date = ms_date(datetime!(2026-10-19 14:00:00 +02:00)).expect("format date");
        assert_eq!(date, "Mon, 19 Oct 2026 12:00:00 GMT");
    }

    #[test]
    fn signs_container_listing_request() {
        let url = Url::parse(
            "http://127.0.0.1:10000/devstoreaccount1/content?restype=container&comp=list&maxresults=1",
        )
        .expect("url");
        let headers = BTreeMap::from([
            (
                "x-ms-date".to_string(),
                "Mon, 19 Oct 2026 12:00:00 GMT".to_string(),
            ),
            ("x-ms-version".to_string(), API_VERSION.to_string()),
        ]);

        let to_sign = string_to_sign("GET", &url, "devstoreaccount1", &headers);
        assert!(to_sign.starts_with("GET\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:"));
        assert!(to_sign.ends_with(
            "/devstoreaccount1/devstoreaccount1/content\ncomp:list\nmaxresults:1\nrestype:container"
        ));

        let key = STANDARD.decode(DEVELOPMENT_KEY).expect("dev key");
        assert_eq!(
            shared_key_signature(&key, &to_sign).expect("sign"),
            "SUVEjyzoGEI0Ohz2GuHQa4dyczPjTgH8qv3LUlER+KU="
        );
    }
}
