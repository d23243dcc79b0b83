//! A tiny path-expression runtime and a mock remote evaluator speaking it

#![allow(dead_code)]

use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use exerciser_core::{invoke_binding, EvalFailure, ResultValue};
use exerciser_runtime::{Evaluation, EvaluationHooks, ExpressionRuntime, RuntimeCapabilities};
use serde_json::{json, Value};

/// Evaluate `a.b.c` paths and `path + number`
///
/// `Ok(None)` means the path matched nothing.
pub fn eval_path(expression: &str, input: Option<&Value>) -> Result<Option<Value>, String> {
    let expression = expression.trim();
    if let Some((lhs, rhs)) = expression.split_once('+') {
        let left = eval_path(lhs, input)?;
        let right: f64 = rhs
            .trim()
            .parse()
            .map_err(|_| format!("cannot add '{}'", rhs.trim()))?;
        return Ok(left.and_then(|v| v.as_f64()).map(|l| json!(l + right)));
    }
    if expression.contains(|c: char| !(c.is_alphanumeric() || c == '.' || c == '_')) {
        return Err(format!("Syntax error: '{}'", expression));
    }
    let mut current = match input {
        Some(value) => value,
        None => return Ok(None),
    };
    for step in expression.split('.') {
        match current.get(step) {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current.clone()))
}

/// Native runtime over `eval_path`, with a few scripted behaviours:
/// `recurse` never returns, `spin` loops at constant depth, `panic` panics
/// and `$name` calls a binding with the input document.
pub struct PathRuntime;

impl ExpressionRuntime for PathRuntime {
    fn capabilities(&self) -> RuntimeCapabilities {
        RuntimeCapabilities {
            hooks: true,
            bindings: true,
        }
    }

    fn evaluate(
        &self,
        evaluation: &Evaluation<'_>,
        hooks: Option<Box<dyn EvaluationHooks>>,
    ) -> Result<Option<ResultValue>, EvalFailure> {
        match evaluation.expression.trim() {
            "recurse" => {
                // without hooks the native stack is what gives out
                let mut hooks = hooks.ok_or(EvalFailure::StackExhausted)?;
                loop {
                    hooks.enter()?;
                }
            }
            "spin" => {
                let mut hooks = hooks.ok_or_else(|| EvalFailure::Runtime("refusing to spin unguarded".into()))?;
                loop {
                    hooks.enter()?;
                    hooks.exit()?;
                }
            }
            "panic" => panic!("runtime invariant broken"),
            expr if expr.starts_with('$') => {
                let arg = evaluation.input.cloned().unwrap_or(Value::Null);
                invoke_binding(evaluation.bindings, &expr[1..], &[arg])
                    .map(|v| Some(ResultValue::from(v)))
                    .map_err(|e| EvalFailure::expression(e.to_string()))
            }
            expr => {
                let mut hooks = hooks;
                if let Some(h) = hooks.as_mut() {
                    h.enter()?;
                }
                let result = eval_path(expr, evaluation.input).map_err(EvalFailure::expression)?;
                if let Some(h) = hooks.as_mut() {
                    h.exit()?;
                }
                Ok(result.map(ResultValue::from))
            }
        }
    }
}

async fn parse_jsonata(mut multipart: Multipart) -> Response {
    let mut json = String::new();
    let mut rule = String::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let text = field.text().await.unwrap_or_default();
        match name.as_str() {
            "json" => json = text,
            "rule" => rule = text,
            _ => {}
        }
    }

    let input: Option<Value> = if json.is_empty() {
        None
    } else {
        match serde_json::from_str(&json) {
            Ok(v) => Some(v),
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        }
    };
    match rule.as_str() {
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "java.lang.IllegalStateException: broken").into_response(),
        "html" => (StatusCode::OK, "<html>gateway</html>").into_response(),
        "empty" => (StatusCode::OK, "").into_response(),
        "null" => (StatusCode::OK, "null").into_response(),
        _ => match eval_path(&rule, input.as_ref()) {
            Ok(Some(value)) => (StatusCode::OK, value.to_string()).into_response(),
            Ok(None) => StatusCode::NO_CONTENT.into_response(),
            Err(message) => (StatusCode::BAD_REQUEST, message).into_response(),
        },
    }
}

pub fn remote_router() -> Router {
    Router::new().route("/parseJsonata", post(parse_jsonata))
}

pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
