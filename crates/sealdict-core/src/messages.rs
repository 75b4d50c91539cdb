//! Wire messages exchanged between client and provider
//!
//! Bodies travel as JSON; byte fields are hex strings.

use serde::{Deserialize, Serialize};

use crate::params::Params;

/// Ask for the XOR of rows `x` and `y`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRequest {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShareStatus {
    Ok,
    IndexOutOfRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareReply {
    /// Empty unless `status` is `OK`
    #[serde(with = "hex_bytes")]
    pub share: Vec<u8>,
    pub status: ShareStatus,
}

impl ShareReply {
    pub fn ok(share: Vec<u8>) -> Self {
        Self {
            share,
            status: ShareStatus::Ok,
        }
    }

    pub fn index_out_of_range() -> Self {
        Self {
            share: Vec::new(),
            status: ShareStatus::IndexOutOfRange,
        }
    }
}

/// Ask for a store's public params
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsRequest {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamsStatus {
    Ok,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsReply {
    pub params: Option<Params>,
    pub status: ParamsStatus,
}

impl ParamsReply {
    pub fn ok(params: Params) -> Self {
        Self {
            params: Some(params),
            status: ParamsStatus::Ok,
        }
    }

    pub fn not_found() -> Self {
        Self {
            params: None,
            status: ParamsStatus::NotFound,
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_reply_json() {
        let reply = ShareReply::ok(vec![0xde, 0xad, 0x00]);
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"{"share":"dead00","status":"OK"}"#);

        let back: ShareReply = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reply);
    }

    #[test]
    fn test_out_of_range_status() {
        let json = serde_json::to_string(&ShareReply::index_out_of_range()).unwrap();
        assert_eq!(json, r#"{"share":"","status":"INDEX_OUT_OF_RANGE"}"#);
    }

    #[test]
    fn test_rejects_bad_hex() {
        let err = serde_json::from_str::<ShareReply>(r#"{"share":"zz","status":"OK"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_params_reply_not_found() {
        let json = serde_json::to_string(&ParamsReply::not_found()).unwrap();
        assert_eq!(json, r#"{"params":null,"status":"NOT_FOUND"}"#);
    }

    #[test]
    fn test_share_request_json() {
        let request: ShareRequest = serde_json::from_str(r#"{"x":3,"y":7}"#).unwrap();
        assert_eq!(request, ShareRequest { x: 3, y: 7 });
    }
}
