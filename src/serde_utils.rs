//! Serde helpers
//!
//! Amounts are carried as decimal strings so they survive JSON consumers
//! that cannot represent 128-bit integers. Hashes travel as hex.

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize/deserialize `u128` as a decimal string (numbers are accepted on input)
pub mod u128_string {
    use super::*;

    pub fn serialize<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
            Raw::Number(n) => Ok(n as u128),
        }
    }
}

/// Serialize/deserialize [u8; 32] as hex string (optional `0x` prefix)
pub mod hex32 {
    use super::*;

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Amount {
        #[serde(with = "super::u128_string")]
        value: u128,
    }

    #[test]
    fn test_u128_string_accepts_numbers_and_strings() {
        let from_str: Amount = serde_json::from_str(r#"{"value":"340282366920938463463374607431768211455"}"#).unwrap();
        assert_eq!(from_str.value, u128::MAX);

        let from_num: Amount = serde_json::from_str(r#"{"value":42}"#).unwrap();
        assert_eq!(from_num.value, 42);

        let json = serde_json::to_string(&Amount { value: 7 }).unwrap();
        assert_eq!(json, r#"{"value":"7"}"#);
    }

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Hash {
        #[serde(with = "super::hex32")]
        value: [u8; 32],
    }

    #[test]
    fn test_hex32_prefix_is_optional() {
        let bare = format!(r#"{{"value":"{}"}}"#, "ab".repeat(32));
        assert_eq!(serde_json::from_str::<Hash>(&bare).unwrap().value, [0xab; 32]);

        let short: Result<Hash, _> = serde_json::from_str(r#"{"value":"0x1234"}"#);
        assert!(short.is_err());
    }
}
