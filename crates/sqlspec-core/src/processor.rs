//! The SQL processor
//!
//! Compile-once orchestration: placeholder scanning, canonicalization,
//! parse (with expression-cache reuse), filter application, the
//! transformation pipeline, and final style conversion. Compiled
//! artifacts land in the compiled or builder cache namespace keyed on
//! statement content plus the config fingerprint.

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::ast::{self, Expression};
use crate::cache::{CacheRegistry, global_caches};
use crate::config::StatementConfig;
use crate::error::{Result, SqlSpecError};
use crate::events::{Event, EventKind, hub};
use crate::filters::{FilterParamSink, filters_fingerprint};
use crate::fingerprint::{Fingerprinter, hash_str};
use crate::params::{
    Placeholder, ResolvedParams, apply_coercions, check_counts, convert_placeholders, scan,
    scan_checked,
};
use crate::pipeline::{TransformContext, run_steps};
use crate::script::split_script;
use crate::statement::{CompiledSql, ExecutionParameters, OperationKind, Sql};
use crate::style::ParameterStyle;
use crate::value::TypedParameter;

/// Compiles [`Sql`] statements into [`CompiledSql`] artifacts.
#[derive(Debug)]
pub struct SqlProcessor {
    caches: Arc<CacheRegistry>,
}

static GLOBAL_PROCESSOR: Lazy<SqlProcessor> = Lazy::new(|| SqlProcessor::new(global_caches()));

impl SqlProcessor {
    pub fn new(caches: Arc<CacheRegistry>) -> Self {
        Self { caches }
    }

    /// The process-wide processor over the global caches.
    pub fn global() -> &'static SqlProcessor {
        &GLOBAL_PROCESSOR
    }

    pub fn caches(&self) -> &Arc<CacheRegistry> {
        &self.caches
    }

    /// Compile a statement to the given target style (the configured
    /// default when omitted).
    #[tracing::instrument(
        skip_all,
        fields(
            kind = %statement.kind(),
            sql_preview = %statement.text().chars().take(80).collect::<String>(),
        )
    )]
    pub fn compile(
        &self,
        statement: &Sql,
        target_style: Option<ParameterStyle>,
    ) -> Result<CompiledSql> {
        let started = Instant::now();
        let config = statement.config();

        let mut target = target_style.unwrap_or(config.parameter_config.default_style);
        if statement.kind() == OperationKind::Script
            && config.parameter_config.needs_static_script_compilation
        {
            target = ParameterStyle::Static;
        }
        if !config.parameter_config.supports(target) {
            return Err(SqlSpecError::Configuration(format!(
                "target style {} is not in the supported set",
                target
            )));
        }
        if statement.kind() == OperationKind::Many && target == ParameterStyle::Static {
            return Err(SqlSpecError::Configuration(
                "batch execution cannot use the static style".to_string(),
            ));
        }

        let sql_fingerprint = hash_str(statement.text());

        if !config.enable_caching {
            let compiled = self.compile_uncached(statement, target)?;
            self.emit_compile_events(statement, &compiled, sql_fingerprint, false, started);
            return Ok(compiled);
        }

        let key = self.cache_key(statement, target);
        let namespace = if statement.builder_state().is_some() {
            self.caches.builder()
        } else {
            self.caches.compiled()
        };
        let mut computed = false;
        let compiled = namespace.get_or_compute(key, || {
            computed = true;
            self.compile_uncached(statement, target)
        })?;
        self.emit_compile_events(statement, &compiled, sql_fingerprint, !computed, started);
        Ok(compiled)
    }

    fn emit_compile_events(
        &self,
        statement: &Sql,
        compiled: &CompiledSql,
        sql_fingerprint: u64,
        cache_hit: bool,
        started: Instant,
    ) {
        let events = hub();
        if !events.is_enabled() {
            return;
        }
        let kind = if cache_hit {
            EventKind::CompileHit
        } else {
            EventKind::CompileMiss
        };
        events.emit_with(|| {
            let mut event = Event::new(kind, sql_fingerprint)
                .with_operation(statement.kind())
                .with_parameter_count(compiled.parameters.count());
            if events.include_raw_sql() {
                event = event.with_sql(statement.text());
            }
            event
        });
        events.emit_with(|| {
            Event::new(EventKind::CompileDuration, sql_fingerprint)
                .with_operation(statement.kind())
                .with_duration(started.elapsed())
        });
    }

    fn cache_key(&self, statement: &Sql, target: ParameterStyle) -> u64 {
        let mut key = Fingerprinter::new();
        key.write_str(statement.text());
        key.write_u64(statement.config().fingerprint());
        key.write_str(target.as_str());
        key.write_u64(filters_fingerprint(statement.filters()));
        key.write_str(&statement.kind().to_string());
        // Parameter values are part of the artifact, so they must be part
        // of the key; the debug rendering is stable for our value model.
        key.write_str(&format!(
            "{:?}|{:?}|{:?}",
            statement.positional_parameters(),
            statement.named_parameters(),
            statement.parameter_batches(),
        ));
        if let Some(state) = statement.builder_state() {
            key.write_bytes(state);
        }
        key.finish()
    }

    fn compile_uncached(&self, statement: &Sql, target: ParameterStyle) -> Result<CompiledSql> {
        match statement.kind() {
            OperationKind::Script => self.compile_script(statement, target),
            OperationKind::Many => self.compile_many(statement, target),
            OperationKind::Single => self.compile_single(statement, target),
        }
    }

    fn compile_single(&self, statement: &Sql, target: ParameterStyle) -> Result<CompiledSql> {
        let config = statement.config();
        let text = statement.text();
        let placeholders = scan_checked(text, &config.parameter_config)?;

        let user = ResolvedParams::new(
            statement.positional_parameters(),
            statement.named_parameters(),
        );
        check_counts(&placeholders, &user)?;

        if !config.enable_parsing {
            return self.compile_raw(statement, target, &placeholders);
        }

        // Canonicalize every placeholder to `$N` so the parser sees one
        // uniform, always-parseable style; conversion renumbers later.
        let canonical = canonicalize(text, &placeholders);
        let prebuilt = placeholders
            .is_empty()
            .then(|| statement.expression())
            .flatten();
        let parsed = self.parse_cached(&canonical, config, prebuilt)?;

        // Filters first, so validation sees their clauses too
        let mut working = (*parsed).clone();
        let mut sink = FilterParamSink::new(placeholders.len());
        for filter in statement.filters() {
            filter.apply(&mut working, &mut sink, config.dialect)?;
        }
        let filter_values = sink.into_values();

        // check_counts proved every scanned placeholder resolves, so the
        // resolvable count equals the placeholder count even when a named
        // parameter is referenced more than once.
        let caches = config.enable_caching.then(|| self.caches.clone());
        let mut ctx = TransformContext::new(
            working,
            placeholders.len() + filter_values.len(),
            placeholders.len() + filter_values.len(),
            config.clone(),
            caches,
        );
        let steps = config.composed_steps();
        run_steps(&steps, &mut ctx)?;

        let generated = ast::generate(&ctx.current, false);
        let final_placeholders = scan(&generated);

        // Canonical slot vector: user placeholders in scan order, then
        // filter parameters, then extracted literals.
        let mut slots: Vec<TypedParameter> = Vec::with_capacity(final_placeholders.len());
        for ph in &placeholders {
            let param = user
                .resolve(ph)
                .ok_or(SqlSpecError::ParameterCountMismatch {
                    expected: placeholders.len(),
                    actual: user.available(),
                })?;
            slots.push(param.clone());
        }
        slots.extend(filter_values);
        slots.extend(ctx.extracted.iter().cloned());

        let empty = IndexMap::new();
        let resolver = ResolvedParams::new(&slots, &empty);
        let expand = !config.parameter_config.has_native_list_expansion;
        let outcome =
            convert_placeholders(&generated, &final_placeholders, &resolver, target, expand)?;
        let parameters = apply_coercions(outcome.parameters, &config.parameter_config)?;

        let mut metadata = ctx.metadata;
        metadata.insert(
            "statement.kind".to_string(),
            ast::statement_kind(&ctx.current).into(),
        );
        Ok(CompiledSql {
            sql: outcome.sql,
            parameters: wrap_single(parameters),
            parameter_style: target,
            metadata,
        })
    }

    /// Parse-disabled fast path: placeholder rewrites over the raw text,
    /// no transformation or validation.
    fn compile_raw(
        &self,
        statement: &Sql,
        target: ParameterStyle,
        placeholders: &[Placeholder],
    ) -> Result<CompiledSql> {
        let config = statement.config();
        if !statement.filters().is_empty() {
            return Err(SqlSpecError::Configuration(
                "statement filters require parsing to be enabled".to_string(),
            ));
        }
        let user = ResolvedParams::new(
            statement.positional_parameters(),
            statement.named_parameters(),
        );
        let expand = !config.parameter_config.has_native_list_expansion;
        let outcome =
            convert_placeholders(statement.text(), placeholders, &user, target, expand)?;
        let parameters = apply_coercions(outcome.parameters, &config.parameter_config)?;
        let mut metadata = IndexMap::new();
        metadata.insert("parsing.skipped".to_string(), true.into());
        Ok(CompiledSql {
            sql: outcome.sql,
            parameters: wrap_single(parameters),
            parameter_style: target,
            metadata,
        })
    }

    /// Batch compilation: the text is rewritten once; every batch is
    /// resolved and coerced independently, in input order. List expansion
    /// is skipped — batches may disagree on list lengths, which would
    /// force per-batch texts.
    fn compile_many(&self, statement: &Sql, target: ParameterStyle) -> Result<CompiledSql> {
        let config = statement.config();
        let text = statement.text();
        let placeholders = scan_checked(text, &config.parameter_config)?;
        let batches = statement.parameter_batches();

        if batches.is_empty() {
            if !placeholders.is_empty() {
                return Err(SqlSpecError::ParameterCountMismatch {
                    expected: placeholders.len(),
                    actual: 0,
                });
            }
            let mut metadata = IndexMap::new();
            metadata.insert("many.batches".to_string(), 0.into());
            return Ok(CompiledSql {
                sql: text.to_string(),
                parameters: ExecutionParameters::Batch(Vec::new()),
                parameter_style: target,
                metadata,
            });
        }

        let empty = IndexMap::new();
        let first = ResolvedParams::new(&batches[0], &empty);
        check_counts(&placeholders, &first)?;
        let outcome = convert_placeholders(text, &placeholders, &first, target, false)?;

        let mut compiled_batches = Vec::with_capacity(batches.len());
        for batch in batches {
            let view = ResolvedParams::new(batch, &empty);
            let batch_outcome = convert_placeholders(text, &placeholders, &view, target, false)?;
            compiled_batches.push(apply_coercions(
                batch_outcome.parameters,
                &config.parameter_config,
            )?);
        }

        let mut metadata = IndexMap::new();
        metadata.insert("many.batches".to_string(), compiled_batches.len().into());
        Ok(CompiledSql {
            sql: outcome.sql,
            parameters: ExecutionParameters::Batch(compiled_batches),
            parameter_style: target,
            metadata,
        })
    }

    /// Script compilation. With per-statement parameter sets each part is
    /// rewritten against its own set; otherwise parameters apply across
    /// the whole script text. The static style inlines everything.
    fn compile_script(&self, statement: &Sql, target: ParameterStyle) -> Result<CompiledSql> {
        let config = statement.config();
        let text = statement.text();
        let parts = split_script(text);
        let expand = !config.parameter_config.has_native_list_expansion;

        let mut metadata = IndexMap::new();
        metadata.insert("script.statement_count".to_string(), parts.len().into());

        let batches = statement.parameter_batches();
        if !batches.is_empty() {
            if batches.len() != parts.len() {
                return Err(SqlSpecError::ParameterCountMismatch {
                    expected: parts.len(),
                    actual: batches.len(),
                });
            }
            let empty = IndexMap::new();
            let mut compiled_parts = Vec::with_capacity(parts.len());
            let mut all_parameters: Vec<TypedParameter> = Vec::new();
            for (part, batch) in parts.iter().zip(batches) {
                let placeholders = scan_checked(part, &config.parameter_config)?;
                let view = ResolvedParams::new(batch, &empty);
                check_counts(&placeholders, &view)?;
                let outcome = convert_placeholders(part, &placeholders, &view, target, expand)?;
                all_parameters.extend(outcome.parameters);
                compiled_parts.push(outcome.sql);
            }
            let sql = compiled_parts
                .iter()
                .map(|p| format!("{};", p))
                .collect::<Vec<_>>()
                .join(" ");
            let parameters = if target == ParameterStyle::Static {
                ExecutionParameters::None
            } else {
                wrap_single(apply_coercions(all_parameters, &config.parameter_config)?)
            };
            return Ok(CompiledSql {
                sql,
                parameters,
                parameter_style: target,
                metadata,
            });
        }

        let placeholders = scan_checked(text, &config.parameter_config)?;
        let user = ResolvedParams::new(
            statement.positional_parameters(),
            statement.named_parameters(),
        );
        check_counts(&placeholders, &user)?;
        let outcome = convert_placeholders(text, &placeholders, &user, target, expand)?;
        let parameters = if target == ParameterStyle::Static {
            ExecutionParameters::None
        } else {
            wrap_single(apply_coercions(outcome.parameters, &config.parameter_config)?)
        };
        Ok(CompiledSql {
            sql: outcome.sql,
            parameters,
            parameter_style: target,
            metadata,
        })
    }

    fn parse_cached(
        &self,
        canonical: &str,
        config: &StatementConfig,
        prebuilt: Option<&Arc<Expression>>,
    ) -> Result<Arc<Expression>> {
        // A builder-produced expression is already the parse of its text
        if let Some(expression) = prebuilt {
            return Ok(expression.clone());
        }
        if !config.enable_caching {
            return ast::parse_one(canonical, config.dialect).map(Arc::new);
        }
        let mut key = Fingerprinter::new();
        key.write_str(canonical);
        key.write_str(config.dialect.name());
        self.caches.expression().get_or_compute(key.finish(), || {
            ast::parse_one(canonical, config.dialect).map(Arc::new)
        })
    }
}

fn wrap_single(parameters: Vec<TypedParameter>) -> ExecutionParameters {
    if parameters.is_empty() {
        ExecutionParameters::None
    } else {
        ExecutionParameters::Single(parameters)
    }
}

/// Rewrite every scanned placeholder to `$N` (N = 1-based scan ordinal).
fn canonicalize(sql: &str, placeholders: &[Placeholder]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut last_end = 0usize;
    for (ordinal, ph) in placeholders.iter().enumerate() {
        out.push_str(&sql[last_end..ph.start]);
        out.push_str(&format!("${}", ordinal + 1));
        last_end = ph.end;
    }
    out.push_str(&sql[last_end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Dialect, ParameterStyleConfig, ValidationOptions};
    use crate::error::ValidationKind;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn processor() -> SqlProcessor {
        SqlProcessor::new(Arc::new(CacheRegistry::default()))
    }

    fn config_for(style: ParameterStyle) -> StatementConfig {
        StatementConfig::new(Dialect::Generic).with_parameter_config(
            ParameterStyleConfig::new(style).with_supported_styles(ParameterStyle::SCANNABLE),
        )
    }

    #[test]
    fn test_style_conversion_scenario() {
        let sql = Sql::with_config(
            "SELECT * FROM u WHERE id = ? AND name = ?",
            config_for(ParameterStyle::Qmark),
        )
        .with_param(7i64)
        .with_param("ann");
        let compiled = processor()
            .compile(&sql, Some(ParameterStyle::Numeric))
            .unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM u WHERE id = $1 AND name = $2");
        let params = compiled.parameters.single();
        assert_eq!(params[0].value, Value::Int(7));
        assert_eq!(params[1].value, Value::Text("ann".into()));
    }

    #[test]
    fn test_list_expansion_scenario() {
        let sql = Sql::with_config(
            "SELECT * FROM u WHERE id IN (?)",
            config_for(ParameterStyle::Qmark),
        )
        .with_param(Value::List(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
        ]));
        let compiled = processor()
            .compile(&sql, Some(ParameterStyle::Qmark))
            .unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM u WHERE id IN (?, ?, ?)");
        let params = compiled.parameters.single();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].value, Value::Int(1));
        assert_eq!(params[2].value, Value::Int(3));
    }

    #[test]
    fn test_literal_parameterization_scenario() {
        let sql = Sql::with_config(
            "SELECT * FROM u WHERE active = true AND age > 18",
            config_for(ParameterStyle::Qmark),
        );
        let compiled = processor()
            .compile(&sql, Some(ParameterStyle::Qmark))
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT * FROM u WHERE active = ? AND age > ?"
        );
        let params = compiled.parameters.single();
        assert_eq!(params[0].value, Value::Bool(true));
        assert_eq!(params[1].value, Value::Int(18));
    }

    #[test]
    fn test_boolean_identity_folds_through_pipeline() {
        let sql = Sql::with_config(
            "SELECT * FROM t WHERE active = ? AND true",
            config_for(ParameterStyle::Qmark),
        )
        .with_param(true);
        let compiled = processor()
            .compile(&sql, Some(ParameterStyle::Qmark))
            .unwrap();
        // The identity operand is folded away, not bound as a parameter
        assert_eq!(compiled.sql, "SELECT * FROM t WHERE active = ?");
        let params = compiled.parameters.single();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].value, Value::Bool(true));
    }

    #[test]
    fn test_high_precision_literal_compiles_to_decimal() {
        let sql = Sql::with_config(
            "SELECT * FROM ledger WHERE amount = 123456789012345.678912",
            config_for(ParameterStyle::Qmark),
        );
        let compiled = processor()
            .compile(&sql, Some(ParameterStyle::Qmark))
            .unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM ledger WHERE amount = ?");
        assert_eq!(
            compiled.parameters.single()[0].value,
            Value::Decimal("123456789012345.678912".into())
        );
    }

    #[test]
    fn test_static_script_scenario() {
        let config = StatementConfig::new(Dialect::Generic).with_parameter_config(
            ParameterStyleConfig::new(ParameterStyle::Qmark)
                .with_static_script_compilation(true),
        );
        let sql = Sql::with_config(
            "INSERT INTO t VALUES (?); INSERT INTO t VALUES (?);",
            config,
        )
        .as_many(vec![vec![1i64], vec![2]])
        .as_script();
        // as_many then as_script keeps the batches but switches the kind
        let compiled = processor().compile(&sql, None).unwrap();
        assert_eq!(
            compiled.sql,
            "INSERT INTO t VALUES (1); INSERT INTO t VALUES (2);"
        );
        assert_eq!(compiled.parameters, ExecutionParameters::None);
        assert_eq!(compiled.parameter_style, ParameterStyle::Static);
    }

    #[test]
    fn test_tautology_scenario() {
        let config = config_for(ParameterStyle::Qmark).with_validation_options(ValidationOptions {
            tautology_detection: true,
            ..Default::default()
        });
        let sql = Sql::with_config("SELECT * FROM u WHERE 1 = 1", config);
        let err = processor().compile(&sql, None).unwrap_err();
        assert!(matches!(
            err,
            SqlSpecError::Validation {
                kind: ValidationKind::Tautology,
                ..
            }
        ));
    }

    #[test]
    fn test_count_mismatch_scenario() {
        let sql = Sql::with_config("SELECT ? , ?", config_for(ParameterStyle::Qmark))
            .with_param(1i64);
        let err = processor().compile(&sql, None).unwrap_err();
        match err {
            SqlSpecError::ParameterCountMismatch { expected, actual } => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_named_colon_compilation() {
        let sql = Sql::with_config(
            "SELECT * FROM u WHERE id = :id AND name = :name",
            config_for(ParameterStyle::NamedColon),
        )
        .with_named_param("id", 7i64)
        .with_named_param("name", "ann");
        let compiled = processor()
            .compile(&sql, Some(ParameterStyle::NamedColon))
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT * FROM u WHERE id = :id AND name = :name"
        );
        let params = compiled.parameters.single();
        assert_eq!(params[0].name.as_deref(), Some("id"));
        assert_eq!(params[1].name.as_deref(), Some("name"));
    }

    #[test]
    fn test_pyformat_input_compiles() {
        let sql = Sql::with_config(
            "SELECT * FROM u WHERE id = %s AND name = %(name)s",
            config_for(ParameterStyle::PositionalPyformat),
        )
        .with_param(1i64)
        .with_named_param("name", "ann");
        let compiled = processor()
            .compile(&sql, Some(ParameterStyle::Numeric))
            .unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM u WHERE id = $1 AND name = $2");
    }

    #[test]
    fn test_parse_disabled_fast_path() {
        let config = config_for(ParameterStyle::Qmark).with_parsing(false);
        let sql = Sql::with_config("SELECT * FROM u WHERE id = ?", config).with_param(5i64);
        let compiled = processor()
            .compile(&sql, Some(ParameterStyle::Numeric))
            .unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM u WHERE id = $1");
        assert_eq!(compiled.metadata.get("parsing.skipped"), Some(&true.into()));
    }

    #[test]
    fn test_many_compiles_once_coerces_per_batch() {
        let sql = Sql::with_config(
            "INSERT INTO t VALUES (?, ?)",
            config_for(ParameterStyle::Qmark),
        )
        .as_many(vec![
            vec![Value::Int(1), Value::Text("a".into())],
            vec![Value::Int(2), Value::Text("b".into())],
        ]);
        let compiled = processor()
            .compile(&sql, Some(ParameterStyle::Numeric))
            .unwrap();
        assert_eq!(compiled.sql, "INSERT INTO t VALUES ($1, $2)");
        let batches = compiled.parameters.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1][0].value, Value::Int(2));
    }

    #[test]
    fn test_many_batch_count_mismatch() {
        let sql = Sql::with_config(
            "INSERT INTO t VALUES (?, ?)",
            config_for(ParameterStyle::Qmark),
        )
        .as_many(vec![vec![Value::Int(1)]]);
        assert!(matches!(
            processor().compile(&sql, None),
            Err(SqlSpecError::ParameterCountMismatch { .. })
        ));
    }

    #[test]
    fn test_warm_expression_cache_matches_cold() {
        let caches = Arc::new(CacheRegistry::default());
        let p = SqlProcessor::new(caches.clone());
        let make = || {
            Sql::with_config(
                "SELECT * FROM u WHERE active = true AND id = ?",
                config_for(ParameterStyle::Qmark),
            )
            .with_param(9i64)
        };
        let cold = p.compile(&make(), Some(ParameterStyle::Numeric)).unwrap();
        let warm = p.compile(&make(), Some(ParameterStyle::Numeric)).unwrap();
        assert_eq!(cold.sql, warm.sql);
        assert_eq!(
            cold.parameters.single().len(),
            warm.parameters.single().len()
        );
        assert!(caches.compiled().stats().hits >= 1);
    }

    #[test]
    fn test_caching_disabled_still_compiles() {
        let config = config_for(ParameterStyle::Qmark).with_caching(false);
        let sql = Sql::with_config("SELECT * FROM u WHERE id = ?", config).with_param(1i64);
        let p = processor();
        let compiled = p.compile(&sql, None).unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM u WHERE id = ?");
        assert!(p.caches().compiled().is_empty());
    }

    #[test]
    fn test_unsupported_target_style_rejected() {
        let config = StatementConfig::new(Dialect::Generic).with_parameter_config(
            ParameterStyleConfig::new(ParameterStyle::Qmark)
                .with_supported_styles([ParameterStyle::Qmark]),
        );
        let sql = Sql::with_config("SELECT 1", config);
        assert!(matches!(
            processor().compile(&sql, Some(ParameterStyle::NamedAt)),
            Err(SqlSpecError::Configuration(_))
        ));
    }

    #[test]
    fn test_filters_apply_before_validation() {
        let sql = Sql::with_config(
            "SELECT * FROM t WHERE active = ?",
            config_for(ParameterStyle::Qmark),
        )
        .with_param(true)
        .filtered(crate::filters::InCollection::new(
            "id",
            vec![Value::Int(1), Value::Int(2)],
        ))
        .filtered(crate::filters::LimitOffset::limit(10));
        let compiled = processor()
            .compile(&sql, Some(ParameterStyle::Qmark))
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT * FROM t WHERE active = ? AND id IN (?, ?) LIMIT 10"
        );
        let params = compiled.parameters.single();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].value, Value::Bool(true));
        assert_eq!(params[1].value, Value::Int(1));
    }

    #[test]
    fn test_script_splits_and_counts() {
        let sql = Sql::with_config(
            "CREATE TABLE t (a INT); INSERT INTO t VALUES (1); SELECT * FROM t",
            config_for(ParameterStyle::Qmark),
        )
        .as_script();
        let compiled = processor().compile(&sql, None).unwrap();
        assert_eq!(
            compiled.metadata.get("script.statement_count"),
            Some(&3.into())
        );
    }

    #[test]
    fn test_round_trip_styles_preserve_values() {
        // qmark -> named -> qmark
        let p = processor();
        let original = Sql::with_config(
            "SELECT * FROM u WHERE a = ? AND b = ?",
            config_for(ParameterStyle::Qmark),
        )
        .with_param(1i64)
        .with_param("x");
        let named = p
            .compile(&original, Some(ParameterStyle::NamedColon))
            .unwrap();
        let back_stmt = Sql::with_config(named.sql.clone(), config_for(ParameterStyle::Qmark))
            .with_param(1i64)
            .with_param("x");
        let back = p.compile(&back_stmt, Some(ParameterStyle::Qmark)).unwrap();
        assert_eq!(
            back.parameters
                .single()
                .iter()
                .map(|p| p.value.clone())
                .collect::<Vec<_>>(),
            original
                .positional_parameters()
                .iter()
                .map(|p| p.value.clone())
                .collect::<Vec<_>>()
        );
    }
}
