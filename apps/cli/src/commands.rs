use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context as _, Result, bail};
use formwork_engine::{FormEngine, evaluate_derived};
use formwork_schema::{Context, FormSchema};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::cli::{CheckArgs, DeriveArgs, EffectsArgs, LintArgs};

/// Exit code when a check finds issues or a lint finds errors.
const FINDINGS: u8 = 1;

pub struct Runner {
    engine: FormEngine,
    pretty: bool,
}

impl Runner {
    pub fn new(engine: FormEngine, pretty: bool) -> Self {
        Self { engine, pretty }
    }

    pub fn check(&self, args: &CheckArgs) -> Result<ExitCode> {
        let form = self.engine.compile(&read_schema(&args.schema)?)?;
        let values = read_values(&args.values)?;

        let issues = if args.effective {
            form.check_effective(&Context::from_values(values))
        } else {
            form.check(&values)
        };
        info!(schema = %form.schema().id, issues = issues.len(), "checked values");

        self.emit(&issues)?;
        Ok(if issues.is_empty() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(FINDINGS)
        })
    }

    pub fn effects(&self, args: &EffectsArgs) -> Result<ExitCode> {
        let form = self.engine.compile(&read_schema(&args.schema)?)?;
        let context = read_context(args.context.as_deref())?;

        let effects = if args.changed.is_empty() {
            form.evaluate(&context)
        } else {
            debug!(changed = ?args.changed, "evaluating affected fields only");
            form.evaluate_changed(&context, &args.changed)
        };
        self.emit(&effects)?;
        Ok(ExitCode::SUCCESS)
    }

    pub fn derive(&self, args: &DeriveArgs) -> Result<ExitCode> {
        let context = read_context(args.context.as_deref())?;
        let derived = evaluate_derived(&args.expression, &context);
        self.emit(&derived)?;
        Ok(ExitCode::SUCCESS)
    }

    pub fn lint(&self, args: &LintArgs) -> Result<ExitCode> {
        let mut reports = Vec::with_capacity(args.schemas.len());
        let mut failed = false;

        for path in &args.schemas {
            let report = match read_schema(path).and_then(|schema| Ok(self.engine.compile(&schema)?)) {
                Ok(form) => json!({
                    "path": path.display().to_string(),
                    "ok": true,
                    "fields": form.schema().field_count(),
                    "fingerprint": form.fingerprint(),
                }),
                Err(err) => {
                    failed = true;
                    let code = err
                        .downcast_ref::<formwork_schema::SchemaError>()
                        .map(formwork_schema::SchemaError::code);
                    json!({
                        "path": path.display().to_string(),
                        "ok": false,
                        "code": code,
                        "error": format!("{err:#}"),
                    })
                }
            };
            reports.push(report);
        }

        self.emit(&reports)?;
        Ok(if failed {
            ExitCode::from(FINDINGS)
        } else {
            ExitCode::SUCCESS
        })
    }

    fn emit<T: Serialize>(&self, output: &T) -> Result<()> {
        let text = if self.pretty {
            serde_json::to_string_pretty(output)?
        } else {
            serde_json::to_string(output)?
        };
        println!("{text}");
        Ok(())
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn read_schema(path: &Path) -> Result<FormSchema> {
    let document = read_json(path)?;
    FormSchema::from_value(document).with_context(|| format!("loading schema {}", path.display()))
}

fn read_values(path: &Path) -> Result<Map<String, Value>> {
    match read_json(path)? {
        Value::Object(values) => Ok(values),
        other => bail!(
            "{} must hold a JSON object of values, found {}",
            path.display(),
            formwork_schema::value::value_type_name(&other)
        ),
    }
}

fn read_context(path: Option<&Path>) -> Result<Context> {
    let Some(path) = path else {
        return Ok(Context::new());
    };
    serde_json::from_value(read_json(path)?).with_context(|| format!("loading context {}", path.display()))
}
