//! Serde adapters for the JSON shapes produced by Go's `encoding/json`.

/// `hexutil.Big`: a `0x`-prefixed hex quantity without leading zeros.
pub mod u256_hex {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Serializes `value` as a minimal `0x` quantity.
    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_zero() {
            return serializer.serialize_str("0x0");
        }
        serializer.serialize_str(&format!("0x{value:x}"))
    }

    /// Deserializes a `0x` quantity, rejecting a missing prefix or empty digits.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| D::Error::custom(format!("hex quantity {s:?} is missing 0x prefix")))?;
        if digits.is_empty() {
            return Err(D::Error::custom("empty hex quantity"));
        }
        U256::from_str_radix(digits, 16).map_err(D::Error::custom)
    }
}

/// `*big.Int`: a bare JSON number, with decimal or `0x` strings also accepted.
///
/// Values above `u64::MAX` serialize as a decimal string since JSON numbers in
/// `serde_json` stop at 64 bits.
pub mod u256_number {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Serializes `value` as a JSON number where it fits.
    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        match u64::try_from(*value) {
            Ok(small) => serializer.serialize_u64(small),
            Err(_) => serializer.collect_str(value),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    /// Deserializes a JSON number, a decimal string or a `0x` string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => Ok(U256::from(n)),
            NumberOrString::String(s) => match s.strip_prefix("0x") {
                Some(hex) => U256::from_str_radix(hex, 16).map_err(D::Error::custom),
                None => U256::from_str_radix(&s, 10).map_err(D::Error::custom),
            },
        }
    }
}
