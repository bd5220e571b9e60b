//! Cross-style placeholder conversion
//!
//! Rewrites SQL text from one placeholder presentation to another while
//! keeping parameter identity and order intact, expanding collection
//! parameters where the driver cannot, and inlining literals for the
//! static style.

use indexmap::IndexMap;

use crate::error::{Result, SqlSpecError, ValidationKind};
use crate::style::ParameterStyle;
use crate::value::{TypedParameter, Value};

use super::{Placeholder, PlaceholderId};

/// The parameter sets a conversion resolves against.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedParams<'a> {
    pub positional: &'a [TypedParameter],
    pub named: &'a IndexMap<String, TypedParameter>,
}

impl<'a> ResolvedParams<'a> {
    pub fn new(
        positional: &'a [TypedParameter],
        named: &'a IndexMap<String, TypedParameter>,
    ) -> Self {
        Self { positional, named }
    }

    pub fn available(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    /// Resolve a placeholder to its parameter.
    ///
    /// Named lookups fall back to synthesized `paramN` names so a
    /// positional → named → positional conversion round-trips.
    pub fn resolve(&self, placeholder: &Placeholder) -> Option<&'a TypedParameter> {
        match &placeholder.id {
            PlaceholderId::Ordinal(i) => self.positional.get(*i),
            PlaceholderId::Index(n) => self.positional.get(n.checked_sub(1)?),
            PlaceholderId::Name(name) => self.named.get(name).or_else(|| {
                let n: usize = name.strip_prefix("param")?.parse().ok()?;
                self.positional.get(n.checked_sub(1)?)
            }),
        }
    }
}

/// Verify that placeholder arithmetic lines up with the provided
/// parameters before any text is rewritten.
pub fn check_counts(placeholders: &[Placeholder], params: &ResolvedParams<'_>) -> Result<()> {
    let mut positional_needed = 0usize;
    let mut names_used: Vec<&str> = Vec::new();
    for ph in placeholders {
        match &ph.id {
            PlaceholderId::Ordinal(i) => positional_needed = positional_needed.max(i + 1),
            PlaceholderId::Index(n) => positional_needed = positional_needed.max(*n),
            PlaceholderId::Name(name) => {
                if params.named.contains_key(name.as_str()) {
                    if !names_used.contains(&name.as_str()) {
                        names_used.push(name);
                    }
                } else if let Some(n) = name
                    .strip_prefix("param")
                    .and_then(|d| d.parse::<usize>().ok())
                {
                    positional_needed = positional_needed.max(n);
                } else {
                    return Err(SqlSpecError::ParameterCountMismatch {
                        expected: placeholders.len(),
                        actual: params.available(),
                    });
                }
            }
        }
    }
    if positional_needed != params.positional.len() || names_used.len() != params.named.len() {
        return Err(SqlSpecError::ParameterCountMismatch {
            expected: positional_needed + names_used.len(),
            actual: params.available(),
        });
    }
    Ok(())
}

/// Result of a placeholder rewrite.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    /// SQL text with placeholders in the target style
    pub sql: String,
    /// Parameters in placeholder order of the new text
    pub parameters: Vec<TypedParameter>,
}

/// Rewrite `sql` so its placeholders use `target`, producing the final
/// parameter vector in output order.
///
/// When `expand_lists` is set, a collection parameter bound to one
/// placeholder becomes a parenthesized run of placeholders with the
/// elements spliced into the vector. With the static target, values are
/// inlined as literals and the vector comes back empty.
pub fn convert_placeholders(
    sql: &str,
    placeholders: &[Placeholder],
    params: &ResolvedParams<'_>,
    target: ParameterStyle,
    expand_lists: bool,
) -> Result<ConversionOutcome> {
    check_counts(placeholders, params)?;

    let mut out = String::with_capacity(sql.len() + 16);
    let mut vector: Vec<TypedParameter> = Vec::with_capacity(placeholders.len());
    let mut last_end = 0usize;
    let mut out_index = 0usize;

    for ph in placeholders {
        out.push_str(&sql[last_end..ph.start]);
        last_end = ph.end;

        let param = params.resolve(ph).ok_or(SqlSpecError::ParameterCountMismatch {
            expected: placeholders.len(),
            actual: params.available(),
        })?;
        let base_name: Option<String> = param.name.clone().or_else(|| ph.name().map(String::from));

        if target == ParameterStyle::Static {
            out.push_str(&param.value.to_sql_literal());
            continue;
        }

        let is_list = matches!(param.value, Value::List(_));
        if expand_lists && is_list {
            let Value::List(items) = &param.value else {
                unreachable!()
            };
            if items.is_empty() {
                return Err(SqlSpecError::validation(
                    ValidationKind::EmptyInList,
                    "cannot expand an empty collection parameter",
                ));
            }
            let tokens: Vec<String> = items
                .iter()
                .enumerate()
                .map(|(k, item)| {
                    let element_name = base_name.as_ref().map(|n| format!("{}__{}", n, k));
                    let token = target.token(out_index, element_name.as_deref());
                    vector.push(TypedParameter {
                        value: item.clone(),
                        declared_type: param.declared_type,
                        name: element_name,
                    });
                    out_index += 1;
                    token
                })
                .collect();
            out.push_str(&tokens.join(", "));
            continue;
        }

        let effective_name = if target.is_named() {
            Some(
                base_name
                    .clone()
                    .unwrap_or_else(|| format!("param{}", out_index + 1)),
            )
        } else {
            base_name.clone()
        };
        out.push_str(&target.token(out_index, effective_name.as_deref()));
        vector.push(TypedParameter {
            value: param.value.clone(),
            declared_type: param.declared_type,
            name: effective_name,
        });
        out_index += 1;
    }

    out.push_str(&sql[last_end..]);
    if target == ParameterStyle::Static {
        vector.clear();
    }
    Ok(ConversionOutcome {
        sql: out,
        parameters: vector,
    })
}
