//! Expression tree for composing [`Condition`] nodes.
//!
//! `Serialize` and `Deserialize` go through [`serde_json::Value`] by hand so
//! the recursive type does not blow up derive monomorphization.

use lf_core::ObjectState;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::condition::Condition;

/// A boolean expression tree over object conditions.
///
/// JSON format (internally tagged with `"type"`):
///
/// ```json
/// { "type": "condition", "condition": { "type": "label", "value": ["car"] } }
/// { "type": "and", "exprs": [...] }
/// { "type": "or",  "exprs": [...] }
/// { "type": "not", "expr": {...} }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Condition(Condition),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

fn expr_to_value(expr: &Expr) -> serde_json::Value {
    match expr {
        Expr::Condition(cond) => serde_json::json!({
            "type": "condition",
            "condition": serde_json::to_value(cond).unwrap_or(serde_json::Value::Null),
        }),
        Expr::And(exprs) => serde_json::json!({
            "type": "and",
            "exprs": exprs.iter().map(expr_to_value).collect::<Vec<_>>(),
        }),
        Expr::Or(exprs) => serde_json::json!({
            "type": "or",
            "exprs": exprs.iter().map(expr_to_value).collect::<Vec<_>>(),
        }),
        Expr::Not(inner) => serde_json::json!({
            "type": "not",
            "expr": expr_to_value(inner),
        }),
    }
}

fn children_from_value(
    obj: &serde_json::Map<String, serde_json::Value>,
    tag: &str,
) -> Result<Vec<Expr>, String> {
    obj.get("exprs")
        .and_then(|v| v.as_array())
        .ok_or_else(|| format!("{tag} expr must have an \"exprs\" array"))?
        .iter()
        .map(expr_from_value)
        .collect()
}

fn expr_from_value(val: &serde_json::Value) -> Result<Expr, String> {
    let obj = val.as_object().ok_or("Expr must be a JSON object")?;
    let type_tag = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("Expr must have a \"type\" field")?;

    match type_tag {
        "condition" => {
            let cond_val = obj
                .get("condition")
                .ok_or("condition expr must have a \"condition\" field")?;
            let cond: Condition = serde_json::from_value(cond_val.clone())
                .map_err(|e| format!("invalid condition: {e}"))?;
            Ok(Expr::Condition(cond))
        }
        "and" => Ok(Expr::And(children_from_value(obj, "and")?)),
        "or" => Ok(Expr::Or(children_from_value(obj, "or")?)),
        "not" => {
            let inner_val = obj
                .get("expr")
                .ok_or("not expr must have an \"expr\" field")?;
            Ok(Expr::Not(Box::new(expr_from_value(inner_val)?)))
        }
        other => Err(format!("unknown expr type: {other}")),
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        expr_to_value(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        expr_from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Evaluate an expression tree against an object state.
///
/// An empty `And` is true and an empty `Or` is false.
pub fn evaluate(expr: &Expr, state: &ObjectState) -> bool {
    match expr {
        Expr::Condition(cond) => cond.evaluate(state),
        Expr::And(exprs) => exprs.iter().all(|e| evaluate(e, state)),
        Expr::Or(exprs) => exprs.iter().any(|e| evaluate(e, state)),
        Expr::Not(inner) => !evaluate(inner, state),
    }
}

/// Whether `state` passes every filter in the list. An empty list passes
/// everything.
pub fn matches_all(filters: &[Expr], state: &ObjectState) -> bool {
    filters.iter().all(|f| evaluate(f, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lf_core::{Shape, ShapeType};

    fn state(label: &str, occluded: bool) -> ObjectState {
        let mut shape = Shape::new(ShapeType::Polygon, 0, label).with_client_id(1);
        shape.occluded = occluded;
        shape.state()
    }

    fn label(l: &str) -> Expr {
        Expr::Condition(Condition::Label(vec![l.into()]))
    }

    #[test]
    fn and_or_not() {
        let s = state("car", false);
        let occluded = Expr::Condition(Condition::Occluded(true));

        assert!(evaluate(&Expr::And(vec![label("car"), Expr::Not(Box::new(occluded.clone()))]), &s));
        assert!(!evaluate(&Expr::And(vec![label("car"), occluded.clone()]), &s));
        assert!(evaluate(&Expr::Or(vec![label("bus"), label("car")]), &s));
        assert!(!evaluate(&Expr::Or(vec![label("bus"), occluded]), &s));
    }

    #[test]
    fn empty_combinators() {
        let s = state("car", false);
        assert!(evaluate(&Expr::And(vec![]), &s));
        assert!(!evaluate(&Expr::Or(vec![]), &s));
    }

    #[test]
    fn matches_all_requires_every_filter() {
        let s = state("car", true);
        assert!(matches_all(&[], &s));
        assert!(matches_all(
            &[label("car"), Expr::Condition(Condition::Occluded(true))],
            &s
        ));
        assert!(!matches_all(&[label("car"), label("bus")], &s));
    }

    #[test]
    fn nested_json_roundtrip() {
        let expr = Expr::Or(vec![
            label("person"),
            Expr::Not(Box::new(Expr::And(vec![
                Expr::Condition(Condition::MinZOrder(0)),
                Expr::Condition(Condition::ShapeType(vec![ShapeType::Points])),
            ]))),
        ]);
        let json = serde_json::to_string(&expr).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
    }

    #[test]
    fn deserialize_errors_are_descriptive() {
        let err = serde_json::from_str::<Expr>(r#"{"type": "and"}"#).unwrap_err();
        assert!(err.to_string().contains("exprs"), "got: {err}");

        let err = serde_json::from_str::<Expr>(r#"{"type": "condition", "condition": {"type": "bogus"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("invalid condition"), "got: {err}");
    }
}
