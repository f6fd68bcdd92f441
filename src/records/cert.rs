use serde::{Deserialize, Serialize};

/// A certificate observation as exchanged on `cert:` lines.
///
/// Sources fill in whatever fields they have; empty fields are omitted from
/// the canonical serialization. Identity is derived from the strongest
/// available signal so the same certificate reported by crt.sh and Censys
/// collapses into one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertRecord {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub common_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub issuer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subject: String,
    /// RFC3339 validity bounds, as reported by the source.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub not_before: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub not_after: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub serial: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fingerprint_sha256: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fingerprint_sha1: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fingerprint_md5: String,
}

impl CertRecord {
    /// Parse a `cert:` payload and normalize it.
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        let mut rec: Self = serde_json::from_str(json)?;
        rec.normalize();
        Ok(rec)
    }

    /// Trim every field, lowercase names and fingerprints, and make the DNS
    /// name set order-insensitive.
    pub fn normalize(&mut self) {
        self.source = self.source.trim().to_string();
        self.common_name = self.common_name.trim().to_ascii_lowercase();
        self.issuer = self.issuer.trim().to_string();
        self.subject = self.subject.trim().to_string();
        self.not_before = self.not_before.trim().to_string();
        self.not_after = self.not_after.trim().to_string();
        self.serial = self.serial.trim().to_ascii_lowercase();
        self.fingerprint_sha256 = self.fingerprint_sha256.trim().to_ascii_lowercase();
        self.fingerprint_sha1 = self.fingerprint_sha1.trim().to_ascii_lowercase();
        self.fingerprint_md5 = self.fingerprint_md5.trim().to_ascii_lowercase();

        let mut names: Vec<String> = self
            .dns_names
            .iter()
            .map(|n| n.trim().to_ascii_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        names.sort();
        names.dedup();
        self.dns_names = names;
    }

    /// Deduplication key: sha256 fingerprint when present, else issuer plus
    /// serial, else CN plus the joined DNS names.
    pub fn identity_key(&self) -> String {
        if !self.fingerprint_sha256.is_empty() {
            return self.fingerprint_sha256.clone();
        }
        if !self.issuer.is_empty() && !self.serial.is_empty() {
            return format!("{}|{}", self.issuer, self.serial);
        }
        format!("{}|{}", self.common_name, self.dns_names.join(","))
    }

    pub fn canonical_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_takes_precedence() {
        let mut rec = CertRecord {
            fingerprint_sha256: "AB:CD".into(),
            issuer: "C=US, O=Let's Encrypt".into(),
            serial: "0123".into(),
            ..Default::default()
        };
        rec.normalize();
        assert_eq!(rec.identity_key(), "ab:cd");
    }

    #[test]
    fn issuer_serial_fallback_then_names() {
        let rec = CertRecord {
            issuer: "C=US, O=Example CA".into(),
            serial: "0a1b".into(),
            ..Default::default()
        };
        assert_eq!(rec.identity_key(), "C=US, O=Example CA|0a1b");

        let rec = CertRecord {
            common_name: "example.com".into(),
            dns_names: vec!["a.example.com".into(), "b.example.com".into()],
            ..Default::default()
        };
        assert_eq!(rec.identity_key(), "example.com|a.example.com,b.example.com");
    }

    #[test]
    fn roundtrip_preserves_identity_key() {
        let mut rec = CertRecord {
            source: "crt.sh".into(),
            common_name: " Example.COM ".into(),
            dns_names: vec!["B.example.com".into(), "a.example.com".into(), "".into()],
            issuer: "C=US, O=Example CA".into(),
            serial: "0A1B".into(),
            ..Default::default()
        };
        rec.normalize();
        let json = rec.canonical_json().unwrap();
        let back = CertRecord::parse(&json).unwrap();
        assert_eq!(back, rec);
        assert_eq!(back.identity_key(), rec.identity_key());
        // name order must not change identity
        let mut reordered = rec.clone();
        reordered.dns_names = vec!["b.example.com".into(), "a.example.com".into()];
        reordered.normalize();
        assert_eq!(reordered.identity_key(), rec.identity_key());
    }

    #[test]
    fn unknown_fields_are_rejected_gracefully() {
        // extra fields are ignored, bad JSON is an error
        assert!(CertRecord::parse(r#"{"common_name":"x.com","extra":1}"#).is_ok());
        assert!(CertRecord::parse("not json").is_err());
    }
}
