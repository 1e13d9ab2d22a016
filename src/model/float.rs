//! Serde helpers for numbers that may arrive as `null`.
//!
//! Non-finite values cannot be written as JSON numbers, so they are stored
//! as `null`. Reading maps `null` back to NaN.

use serde::{Deserialize, Deserializer};

pub(crate) fn nan_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

pub(crate) fn vec_nan_if_null<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Option<f64>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "nan_if_null")]
        value: f64,
        #[serde(deserialize_with = "vec_nan_if_null")]
        values: Vec<f64>,
    }

    #[test]
    fn test_null_reads_as_nan() {
        let sample: Sample = serde_json::from_str(r#"{"value": null, "values": [1, null]}"#).unwrap();
        assert!(sample.value.is_nan());
        assert_eq!(sample.values[0], 1.0);
        assert!(sample.values[1].is_nan());
    }
}
