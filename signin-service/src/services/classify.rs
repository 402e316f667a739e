use serde_json::{Map, Value};

/// A sign-in request after trust-level selection.
///
/// Downstream code only ever sees this; the raw field map is gone after
/// classification. The scope variant keeps the map because the scope's
/// signin statement receives every request field as a bound variable.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedRequest {
    Scope {
        ns: String,
        db: String,
        sc: String,
        vars: Map<String, Value>,
    },
    Database {
        ns: String,
        db: String,
        user: String,
        pass: String,
    },
    Namespace {
        ns: String,
        user: String,
        pass: String,
    },
    Invalid,
}

fn selector(vars: &Map<String, Value>, key: &str) -> Option<String> {
    match vars.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn credential(vars: &Map<String, Value>, key: &str) -> String {
    match vars.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Select exactly one trust level for the request.
///
/// Scope beats database beats namespace; anything without a namespace is
/// invalid. Pure function of the field map; a missing or non-string
/// selector counts as absent. Credentials come through as possibly-empty
/// strings so the credential resolver owns the missing-credentials failure.
pub fn classify(vars: Map<String, Value>) -> ClassifiedRequest {
    let ns = selector(&vars, "NS");
    let db = selector(&vars, "DB");
    let sc = selector(&vars, "SC");

    match (ns, db, sc) {
        (Some(ns), Some(db), Some(sc)) => ClassifiedRequest::Scope { ns, db, sc, vars },
        (Some(ns), Some(db), None) => ClassifiedRequest::Database {
            ns,
            db,
            user: credential(&vars, "user"),
            pass: credential(&vars, "pass"),
        },
        (Some(ns), None, _) => ClassifiedRequest::Namespace {
            ns,
            user: credential(&vars, "user"),
            pass: credential(&vars, "pass"),
        },
        (None, _, _) => ClassifiedRequest::Invalid,
    }
}
