use serde::{Deserialize, Serialize};

/// A resolved DNS observation as exchanged on `dns:` lines. One record per
/// (host, type, value); PTR lookups may carry the full pointer list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsRecord {
    pub host: String,
    #[serde(rename = "type")]
    pub rtype: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptr: Option<Vec<String>>,
}

impl DnsRecord {
    pub fn new(host: &str, rtype: &str, value: &str) -> Self {
        let mut rec = Self {
            host: host.to_string(),
            rtype: rtype.to_string(),
            value: value.to_string(),
            ptr: None,
        };
        rec.normalize();
        rec
    }

    /// Parse a `dns:` payload and normalize it.
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        let mut rec: Self = serde_json::from_str(json)?;
        rec.normalize();
        Ok(rec)
    }

    pub fn normalize(&mut self) {
        self.host = self
            .host
            .trim()
            .trim_end_matches('.')
            .to_ascii_lowercase();
        self.rtype = self.rtype.trim().to_ascii_uppercase();
        self.value = self.value.trim().trim_end_matches('.').to_string();
        if let Some(ptr) = &mut self.ptr {
            for p in ptr.iter_mut() {
                *p = p.trim().trim_end_matches('.').to_ascii_lowercase();
            }
            ptr.retain(|p| !p.is_empty());
        }
    }

    /// Deduplication key. The pointer list does not participate.
    pub fn identity_key(&self) -> String {
        format!("{}|{}|{}", self.host, self.rtype, self.value)
    }

    pub fn canonical_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_host_type_value() {
        let a = DnsRecord::new("Example.com.", "a", "1.2.3.4");
        assert_eq!(a.identity_key(), "example.com|A|1.2.3.4");

        let mut b = DnsRecord::new("example.com", "A", "1.2.3.4");
        b.ptr = Some(vec!["host.example.com".into()]);
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn type_field_roundtrips_as_type() {
        let rec = DnsRecord::new("example.com", "CNAME", "edge.example.net");
        let json = rec.canonical_json().unwrap();
        assert!(json.contains(r#""type":"CNAME""#));
        assert_eq!(DnsRecord::parse(&json).unwrap(), rec);
    }
}
