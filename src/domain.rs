//! ==============================================================================
//! domain.rs - wire types shared by the http layer and the cache
//! ==============================================================================
//!
//! purpose:
//!     defines the payload the weather station posts, the prompt rendered
//!     from it, and the json envelopes both endpoints answer with.
//!
//! relationships:
//!     - used by: server.rs (request decoding, response envelopes)
//!     - used by: cache.rs (the cached reading)
//!
//! coercion:
//!     the station firmware is not strict about json types. numeric fields
//!     are accepted as json numbers or as strings holding a number, and the
//!     encoder position may arrive as a float with no fractional part.
//!     nothing is range-checked.
//!
//! ==============================================================================

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// one reading posted by the weather station
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// temperature in celsius
    #[serde(deserialize_with = "lax_f64")]
    pub temperatura: f64,
    /// relative humidity (%)
    #[serde(deserialize_with = "lax_f64")]
    pub umidade: f64,
    /// pressure in hPa
    #[serde(deserialize_with = "lax_f64")]
    pub pressao: f64,
    /// anemometer pulse frequency in Hz
    #[serde(deserialize_with = "lax_f64")]
    pub frequencia_vento: f64,
    /// wind direction as reported by the vane encoder (e.g. "NE")
    pub direcao_encoder: String,
    /// raw vane encoder position
    #[serde(deserialize_with = "lax_i64")]
    pub posicao_encoder: i64,
}

impl SensorReading {
    /// render the prompt sent to the generation service
    ///
    /// formatting is fixed: temperature and humidity with 1 decimal,
    /// pressure and wind frequency with 2, direction and position verbatim.
    pub fn to_prompt(&self) -> String {
        format!(
            "Dados recebidos de uma estação climática:\n\
             Temperatura: {:.1} °C\n\
             Umidade: {:.1} %\n\
             Pressão: {:.2} hPa\n\
             Frequência do vento: {:.2} Hz\n\
             Direção do vento: {}\n\
             Posição do encoder: {}\n\
             \n\
             Gere um insight interpretativo e claro para o usuário sobre o clima atual.",
            self.temperatura,
            self.umidade,
            self.pressao,
            self.frequencia_vento,
            self.direcao_encoder,
            self.posicao_encoder,
        )
    }
}

// ==============================================================================
// response envelopes
// ==============================================================================
// both endpoints answer 200 with a `status` discriminator. upstream failures
// are reported in-band rather than through the http status code.

/// answer to `POST /api/dados`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IngestResponse {
    Ok { insight: String },
    Error { message: String },
}

/// answer to `GET /api/dados/ultimos`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LatestResponse {
    Ok {
        timestamp: DateTime<Utc>,
        dados: SensorReading,
        insight: String,
    },
    Error { message: String },
}

// ==============================================================================
// lax numeric decoding
// ==============================================================================

struct LaxFloat;

impl<'de> Visitor<'de> for LaxFloat {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or a string holding a number")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
        // "nan" and "inf" parse but cannot be echoed back as json
        match v.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(n),
            _ => Err(E::invalid_value(Unexpected::Str(v), &self)),
        }
    }
}

struct LaxInt;

impl<'de> Visitor<'de> for LaxInt {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer or a string holding an integer")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        i64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
        if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
            Ok(v as i64)
        } else {
            Err(E::invalid_value(Unexpected::Float(v), &self))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        v.trim()
            .parse::<i64>()
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

fn lax_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    deserializer.deserialize_any(LaxFloat)
}

fn lax_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    deserializer.deserialize_any(LaxInt)
}
