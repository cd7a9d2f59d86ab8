//! Master key authorization for the Cosmos DB REST API.
//!
//! Every request carries an `authorization` header built from an HMAC-SHA256
//! signature of the verb, resource type, resource link and request date,
//! keyed with the decoded account master key.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::store::Error;

type HmacSha256 = Hmac<Sha256>;

/// Decoded account master key.
#[derive(Clone)]
pub struct MasterKey {
    key: Vec<u8>,
}

impl MasterKey {
    pub fn try_new(encoded: &str) -> Result<Self, Error> {
        let key = BASE64
            .decode(encoded.trim())
            .map_err(|e| Error::InvalidKey(e.to_string()))?;

        if key.is_empty() {
            return Err(Error::InvalidKey("empty key".to_owned()));
        }

        Ok(Self { key })
    }

    /// Builds the url-encoded value of the `authorization` header.
    ///
    /// `resource_link` is case sensitive and must not be url-encoded, while
    /// verb, resource type and date are lowercased before signing.
    pub fn authorization(
        &self,
        verb: &str,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> Result<String, Error> {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.to_lowercase(),
            resource_type.to_lowercase(),
            resource_link,
            date.to_lowercase()
        );

        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|e| Error::InvalidKey(e.to_string()))?;
        mac.update(payload.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        let token = format!("type=master&ver=1.0&sig={signature}");
        Ok(url::form_urlencoded::byte_serialize(token.as_bytes()).collect())
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(***)")
    }
}

/// Current date in the RFC 1123 format expected by the `x-ms-date` header.
pub fn http_date_now() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // base64 of "0123456789abcdef0123456789abcdef"
    const KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

    #[test]
    fn signature() {
        let key = MasterKey::try_new(KEY).unwrap();

        let auth = key
            .authorization(
                "GET",
                "docs",
                "dbs/ToDoList/colls/Items/docs/item1",
                "Thu, 27 Apr 2017 00:51:12 GMT",
            )
            .unwrap();

        assert_eq!(
            auth,
            "type%3Dmaster%26ver%3D1.0%26sig%3DR09SRyEL06KJiUnKsBHPp0wAy5vX84ZjajmVDxhHzyI%3D"
        );
    }

    #[test]
    fn signature_depends_on_link_case() {
        let key = MasterKey::try_new(KEY).unwrap();
        let date = "Thu, 27 Apr 2017 00:51:12 GMT";

        let lower = key.authorization("GET", "dbs", "dbs/mydb", date).unwrap();
        let upper = key.authorization("GET", "dbs", "dbs/MyDb", date).unwrap();
        assert_ne!(lower, upper);

        // verb and resource type are case insensitive
        let verb = key.authorization("get", "DBS", "dbs/mydb", date).unwrap();
        assert_eq!(lower, verb);
    }

    #[test]
    fn invalid_keys() {
        assert!(MasterKey::try_new("not base64 !!").is_err());
        assert!(MasterKey::try_new("").is_err());
    }

    #[test]
    fn key_is_not_printed() {
        let key = MasterKey::try_new(KEY).unwrap();
        assert_eq!(format!("{key:?}"), "MasterKey(***)");
    }

    #[test]
    fn date_format() {
        let date = http_date_now();
        assert!(date.ends_with(" GMT"));
        // e.g. "Thu, 27 Apr 2017 00:51:12 GMT"
        assert_eq!(date.len(), 29);
    }
}
