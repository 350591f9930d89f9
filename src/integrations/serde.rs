use std::fmt;

use indexmap::IndexMap;
use serde::{
    Deserialize, Serialize,
    de::{self, Deserializer},
    ser::{SerializeMap as _, Serializer},
};

use crate::{
    CostError, CostMetrics, GraphQLError, Object, Value,
    ast::{InputValue, SourcePosition},
    engine::Response,
    executor::{ExecutionError, PathSegment},
    value::ScalarValue,
};

struct Location<'a>(&'a SourcePosition);

impl Serialize for Location<'_> {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        let mut map = ser.serialize_map(Some(2))?;

        map.serialize_key("line")?;
        map.serialize_value(&self.0.line)?;

        map.serialize_key("column")?;
        map.serialize_value(&self.0.column)?;

        map.end()
    }
}

impl Serialize for ExecutionError {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        let mut map = ser.serialize_map(Some(4))?;

        map.serialize_key("message")?;
        map.serialize_value(self.error().message())?;

        let locations = [Location(self.location())];
        map.serialize_key("locations")?;
        map.serialize_value(&locations)?;

        map.serialize_key("path")?;
        map.serialize_value(self.path())?;

        if !self.error().extensions().is_null() {
            map.serialize_key("extensions")?;
            map.serialize_value(self.error().extensions())?;
        }

        map.end()
    }
}

impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Field(name) => ser.serialize_str(name),
            Self::Index(idx) => ser.serialize_u64(*idx as u64),
        }
    }
}

impl Serialize for GraphQLError {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Extensions<'a> {
            code: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            cost: Option<f64>,
            #[serde(skip_serializing_if = "Option::is_none")]
            limit: Option<f64>,
            #[serde(skip_serializing_if = "Option::is_none")]
            metrics: Option<&'a CostMetrics>,
        }

        #[derive(Serialize)]
        struct Helper<'a> {
            message: String,
            extensions: Extensions<'a>,
        }

        let message = match self {
            Self::NoOperationProvided => "Must provide an operation".into(),
            Self::MultipleOperationsProvided => {
                "Must provide operation name if query contains multiple operations".into()
            }
            Self::UnknownOperationName => "Unknown operation".into(),
            Self::IsSubscription => "Expected query or mutation, got subscription".into(),
            Self::ParseError(_)
            | Self::MissingRootType(_)
            | Self::Cost(_)
            | Self::CostReport { .. } => self.to_string(),
        };
        let (error, metrics) = match self {
            Self::Cost(e) => (Some(e), None),
            Self::CostReport { error, metrics } => (Some(error), Some(metrics)),
            _ => (None, None),
        };
        let (cost, limit) = match error {
            Some(
                CostError::MaxFieldCostReached { cost, limit }
                | CostError::MaxTypeCostReached { cost, limit },
            ) => (Some(*cost), Some(*limit)),
            _ => (None, None),
        };
        [Helper {
            message,
            extensions: Extensions {
                code: self.code(),
                cost,
                limit,
                metrics,
            },
        }]
        .serialize(ser)
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        let mut map = ser.serialize_map(None)?;

        map.serialize_key("data")?;
        map.serialize_value(&self.data)?;

        if !self.errors.is_empty() {
            map.serialize_key("errors")?;
            map.serialize_value(&self.errors)?;
        }

        if let Some(extensions) = &self.extensions {
            map.serialize_key("extensions")?;
            map.serialize_value(extensions)?;
        }

        map.end()
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        let mut map = ser.serialize_map(Some(self.field_count()))?;
        for (f, v) in self.iter() {
            map.serialize_key(f)?;
            map.serialize_value(v)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => ser.serialize_unit(),
            Self::Scalar(s) => s.serialize(ser),
            Self::List(l) => l.serialize(ser),
            Self::Object(o) => o.serialize(ser),
        }
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int(i) => ser.serialize_i32(*i),
            Self::Float(f) => ser.serialize_f64(*f),
            Self::String(s) => ser.serialize_str(s),
            Self::Boolean(b) => ser.serialize_bool(*b),
        }
    }
}

impl<'de> Deserialize<'de> for InputValue {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = InputValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a valid input value")
            }

            fn visit_bool<E: de::Error>(self, b: bool) -> Result<Self::Value, E> {
                Ok(InputValue::scalar(b))
            }

            fn visit_i64<E: de::Error>(self, n: i64) -> Result<Self::Value, E> {
                // Integers out of the `Int` range become floats.
                Ok(InputValue::scalar(n))
            }

            fn visit_u64<E: de::Error>(self, n: u64) -> Result<Self::Value, E> {
                match i64::try_from(n) {
                    Ok(n) => self.visit_i64(n),
                    Err(_) => Ok(InputValue::scalar(n as f64)),
                }
            }

            fn visit_f64<E: de::Error>(self, f: f64) -> Result<Self::Value, E> {
                Ok(InputValue::scalar(f))
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
                Ok(InputValue::scalar(s))
            }

            fn visit_string<E: de::Error>(self, s: String) -> Result<Self::Value, E> {
                Ok(InputValue::scalar(s))
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(InputValue::Null)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(InputValue::Null)
            }

            fn visit_seq<V>(self, mut visitor: V) -> Result<Self::Value, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vals = Vec::new();
                while let Some(v) = visitor.next_element()? {
                    vals.push(v);
                }
                Ok(InputValue::list(vals))
            }

            fn visit_map<V>(self, mut visitor: V) -> Result<Self::Value, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut obj = IndexMap::<String, InputValue>::with_capacity(
                    visitor.size_hint().unwrap_or(0),
                );
                while let Some((key, val)) = visitor.next_entry()? {
                    obj.insert(key, val);
                }
                Ok(InputValue::Object(obj))
            }
        }

        de.deserialize_any(Visitor)
    }
}
