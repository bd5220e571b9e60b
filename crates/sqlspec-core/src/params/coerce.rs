//! Elementwise parameter type coercion
//!
//! Applied to the final parameter vector, after style conversion and list
//! expansion, so coercion functions see exactly what the driver will.

use crate::config::ParameterStyleConfig;
use crate::error::{Result, SqlSpecError};
use crate::value::TypedParameter;

/// Run the configured coercion map over a parameter vector.
///
/// Dispatch is on each parameter's effective type (declared hint first,
/// inferred tag otherwise). Parameters without a matching coercion pass
/// through untouched.
pub fn apply_coercions(
    parameters: Vec<TypedParameter>,
    config: &ParameterStyleConfig,
) -> Result<Vec<TypedParameter>> {
    parameters
        .into_iter()
        .enumerate()
        .map(|(index, parameter)| {
            let Some(coercion) = config.coercion_for(parameter.effective_type()) else {
                return Ok(parameter);
            };
            let TypedParameter {
                value,
                declared_type,
                name,
            } = parameter;
            let source_type = value.type_tag().as_str();
            let value = (coercion.apply)(value).map_err(|reason| {
                tracing::debug!(index, source_type, coercion = coercion.name, %reason, "parameter coercion failed");
                SqlSpecError::ParameterCoercion {
                    index,
                    source_type,
                    target: coercion.name.to_string(),
                }
            })?;
            Ok(TypedParameter {
                value,
                declared_type,
                name,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::ParameterStyle;
    use crate::value::{TypeTag, Value};

    fn config_with_bool_to_int() -> ParameterStyleConfig {
        ParameterStyleConfig::new(ParameterStyle::Qmark).with_coercion(
            "bool_to_int",
            TypeTag::Bool,
            |v| match v {
                Value::Bool(b) => Ok(Value::Int(i64::from(b))),
                other => Err(format!("not a bool: {}", other)),
            },
        )
    }

    #[test]
    fn test_coercion_applies_by_tag() {
        let config = config_with_bool_to_int();
        let out = apply_coercions(
            vec![
                TypedParameter::new(true),
                TypedParameter::new(7i64),
                TypedParameter::new(false),
            ],
            &config,
        )
        .unwrap();
        assert_eq!(out[0].value, Value::Int(1));
        assert_eq!(out[1].value, Value::Int(7));
        assert_eq!(out[2].value, Value::Int(0));
    }

    #[test]
    fn test_coercion_failure_carries_index() {
        let config = ParameterStyleConfig::new(ParameterStyle::Qmark).with_coercion(
            "text_to_int",
            TypeTag::Text,
            |v| match v {
                Value::Text(s) => s
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|e| e.to_string()),
                other => Err(format!("not text: {}", other)),
            },
        );
        let err = apply_coercions(
            vec![TypedParameter::new(1i64), TypedParameter::new("nope")],
            &config,
        )
        .unwrap_err();
        match err {
            SqlSpecError::ParameterCoercion {
                index,
                source_type,
                target,
            } => {
                assert_eq!(index, 1);
                assert_eq!(source_type, "text");
                assert_eq!(target, "text_to_int");
            }
            other => panic!("expected coercion error, got {:?}", other),
        }
    }

    #[test]
    fn test_declared_type_drives_dispatch() {
        let config = config_with_bool_to_int();
        // Declared as text: the bool coercion must not fire
        let out = apply_coercions(
            vec![TypedParameter::new(true).with_declared_type(TypeTag::Text)],
            &config,
        )
        .unwrap();
        assert_eq!(out[0].value, Value::Bool(true));
    }

    #[test]
    fn test_null_values_pass_through() {
        let config = config_with_bool_to_int();
        let out = apply_coercions(vec![TypedParameter::new(Value::Null)], &config).unwrap();
        assert!(out[0].value.is_null());
    }
}
