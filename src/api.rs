
pub mod client;
pub mod error;
pub mod id;
pub mod experiment;
pub mod run;
pub mod search;

// MLflow encodes int64 fields as JSON strings, older servers as numbers.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum IntOrStr {
    Int(i64),
    Str(String),
}

impl IntOrStr {
    fn into_i64<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            IntOrStr::Int(int) => Ok(int),
            IntOrStr::Str(s) => s.trim().parse().map_err(E::custom),
        }
    }
}

// deserialize i64 from int or str
mod int_or_str {
    use serde::de::{Deserialize, Deserializer};

    use super::IntOrStr;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>
    {
        IntOrStr::deserialize(deserializer)?.into_i64()
    }
}

// deserialize Option<i64> from Option<int or str>
mod opt_int_or_str {
    use serde::de::{Deserialize, Deserializer};

    use super::IntOrStr;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>
    {
        match Option::<IntOrStr>::deserialize(deserializer)? {
            Some(value) => Ok(Some(value.into_i64()?)),
            None => Ok(None),
        }
    }
}

// MLflow writes non-finite metric values as the strings "NaN", "Infinity" and "-Infinity".
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum FloatOrStr {
    Float(f64),
    Str(String),
}

// deserialize f64 from float or str
mod float_or_str {
    use serde::de::{self, Deserialize, Deserializer};

    use super::FloatOrStr;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>
    {
        match FloatOrStr::deserialize(deserializer)? {
            FloatOrStr::Float(float) => Ok(float),
            FloatOrStr::Str(s) => match s.trim() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => other.parse().map_err(de::Error::custom),
            },
        }
    }
}
