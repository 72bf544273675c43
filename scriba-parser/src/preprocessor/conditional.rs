//! Conditional directives: `ifdef::[]`, `ifndef::[]`, `ifeval::[]`, `endif::[]`.

use crate::{AttributeStore, diagnostics::Diagnostics, subst::Substitutor};

#[derive(Debug)]
pub(crate) enum Conditional {
    Ifdef(Ifdef),
    Ifndef(Ifndef),
    Ifeval(Ifeval),
}

/// Combinator between multiple attribute names: `,` is any-of, `+` is all-of.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Operation {
    Or,
    And,
}

#[derive(Debug)]
pub(crate) struct Ifdef {
    attributes: Vec<String>,
    pub(crate) content: Option<String>,
    operation: Option<Operation>,
}

#[derive(Debug)]
pub(crate) struct Ifndef {
    attributes: Vec<String>,
    pub(crate) content: Option<String>,
    operation: Option<Operation>,
}

#[derive(Debug)]
pub(crate) struct Ifeval {
    left: String,
    operator: Operator,
    right: String,
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
enum EvalValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Operator {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

#[derive(Debug)]
pub(crate) struct Endif {
    pub(crate) attribute: Option<String>,
}

peg::parser! {
    grammar conditional_parser() for str {
        pub(crate) rule conditional() -> Conditional
            = ifdef() / ifndef() / ifeval()

        pub(crate) rule endif() -> Endif
            = "endif::" attribute:name()? "[]" {
                Endif {
                    attribute
                }
            }

        rule ifdef() -> Conditional
            = "ifdef::" a:attributes() "[" content:content()? "]" {
                Conditional::Ifdef(Ifdef {
                    attributes: a.0,
                    operation: a.1,
                    content,
                })
            }

        rule ifndef() -> Conditional
            = "ifndef::" a:attributes() "[" content:content()? "]" {
                Conditional::Ifndef(Ifndef {
                    attributes: a.0,
                    operation: a.1,
                    content,
                })
            }

        rule ifeval() -> Conditional
            = "ifeval::[" left:eval_value() operator:operator() right:eval_value() "]" {
                // Operands stay raw strings here; evaluation coerces them once the
                // attribute values in scope are known.
                Conditional::Ifeval(Ifeval {
                    left,
                    operator,
                    right,
                })
            }

        rule attributes() -> (Vec<String>, Option<Operation>)
            = n1:name() op:operation() rest:(n:name() { n })* {
                let mut names = vec![n1];
                names.extend(rest);
                (names, Some(op))
            }
        / n1:name() { (vec![n1], None) }

        rule operation() -> Operation
            = "+" { Operation::And }
        / "," { Operation::Or }

        rule eval_value() -> String
            = n:$((!operator() ![']'] [_])+) {
                n.trim().to_string()
            }

        rule operator() -> Operator
        = "==" { Operator::Equal }
        / "!=" { Operator::NotEqual }
        / "<=" { Operator::LessThanOrEqual }
        / ">=" { Operator::GreaterThanOrEqual }
        / "<" { Operator::LessThan }
        / ">" { Operator::GreaterThan }

        rule name_match() = (!['[' | ',' | '+'] [_])+

        rule name() -> String
            = n:$(name_match()) {
                n.to_string()
            }

        rule content() -> String
            = c:$((!"]" [_])+) {
                c.to_string()
            }
    }
}

/// Parse a conditional directive line, or `None` if it is not one.
pub(crate) fn parse_line(line: &str) -> Option<Conditional> {
    conditional_parser::conditional(line).ok()
}

/// Parse an `endif` directive line.
pub(crate) fn parse_endif(line: &str) -> Option<Endif> {
    conditional_parser::endif(line).ok()
}

impl Conditional {
    fn evaluate_attributes(
        attrs: &[String],
        operation: Option<&Operation>,
        store: &AttributeStore,
        negate: bool,
    ) -> bool {
        let result = match operation {
            Some(Operation::Or) => attrs.iter().any(|attr| store.is_set(attr)),
            _ => attrs.iter().all(|attr| store.is_set(attr)),
        };
        if negate { !result } else { result }
    }

    /// The single-line content form, if this directive used it.
    pub(crate) fn content(&self) -> Option<&str> {
        match self {
            Conditional::Ifdef(ifdef) => ifdef.content.as_deref(),
            Conditional::Ifndef(ifndef) => ifndef.content.as_deref(),
            Conditional::Ifeval(_) => None,
        }
    }

    /// Names this directive tests, for matching a named `endif`.
    pub(crate) fn names(&self) -> &[String] {
        match self {
            Conditional::Ifdef(ifdef) => &ifdef.attributes,
            Conditional::Ifndef(ifndef) => &ifndef.attributes,
            Conditional::Ifeval(_) => &[],
        }
    }

    pub(crate) fn is_true(
        &self,
        store: &AttributeStore,
        diagnostics: &mut Diagnostics,
        line_number: usize,
    ) -> bool {
        match self {
            Conditional::Ifdef(ifdef) => Self::evaluate_attributes(
                &ifdef.attributes,
                ifdef.operation.as_ref(),
                store,
                false,
            ),
            Conditional::Ifndef(ifndef) => Self::evaluate_attributes(
                &ifndef.attributes,
                ifndef.operation.as_ref(),
                store,
                true,
            ),
            Conditional::Ifeval(ifeval) => ifeval.evaluate(store, diagnostics, line_number),
        }
    }
}

impl Endif {
    /// Whether this `endif` names the given conditional (an unnamed `endif` closes
    /// anything).
    pub(crate) fn closes(&self, conditional: &Conditional) -> bool {
        match &self.attribute {
            Some(attribute) => conditional.names().contains(attribute),
            None => true,
        }
    }
}

impl Ifeval {
    /// Evaluate the comparison. Operands resolve attribute references first, then
    /// coerce to booleans or numbers where possible. Comparing different types is a
    /// diagnostic and evaluates to false; it never aborts the parse.
    fn evaluate(
        &self,
        store: &AttributeStore,
        diagnostics: &mut Diagnostics,
        line_number: usize,
    ) -> bool {
        let left = EvalValue::resolve(&self.left, store, diagnostics, line_number);
        let right = EvalValue::resolve(&self.right, store, diagnostics, line_number);

        match (&left, &right) {
            (EvalValue::Number(_), EvalValue::Number(_))
            | (EvalValue::Boolean(_), EvalValue::Boolean(_))
            | (EvalValue::String(_), EvalValue::String(_)) => {}
            _ => {
                diagnostics.warn(
                    Some(line_number),
                    "ifeval compares different operand types; treating as false",
                );
                return false;
            }
        }

        match self.operator {
            Operator::Equal => left == right,
            Operator::NotEqual => left != right,
            Operator::LessThan => left < right,
            Operator::GreaterThan => left > right,
            Operator::LessThanOrEqual => left <= right,
            Operator::GreaterThanOrEqual => left >= right,
        }
    }
}

impl EvalValue {
    fn resolve(
        raw: &str,
        store: &AttributeStore,
        diagnostics: &mut Diagnostics,
        line_number: usize,
    ) -> Self {
        // Substitute attribute references, then try to coerce: bool, number,
        // arithmetic expression, quoted string, bare string - in that order.
        let s = Substitutor::new(store, diagnostics, line_number).substitute_attributes(raw);
        s.parse::<bool>()
            .map(EvalValue::Boolean)
            .or_else(|_| s.parse::<f64>().map(EvalValue::Number))
            .or_else(|_| evalexpr::eval_float(&s).map(EvalValue::Number))
            .or_else(|_| {
                #[allow(clippy::cast_precision_loss)]
                let as_float = evalexpr::eval_int(&s).map(|v| v as f64);
                as_float.map(EvalValue::Number)
            })
            .unwrap_or_else(|_| EvalValue::String(Self::strip_quotes(&s)))
    }

    fn strip_quotes(s: &str) -> String {
        if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
            s[1..s.len() - 1].to_string()
        } else if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
            s[1..s.len() - 1].to_string()
        } else {
            s.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_true(line: &str, store: &AttributeStore) -> bool {
        let mut diagnostics = Diagnostics::default();
        parse_line(line)
            .map(|c| c.is_true(store, &mut diagnostics, 1))
            .unwrap_or(false)
    }

    #[test]
    fn test_ifdef_single_attribute() {
        let mut store = AttributeStore::default();
        assert!(!is_true("ifdef::feature[]", &store));
        store.set("feature", true);
        assert!(is_true("ifdef::feature[]", &store));
    }

    #[test]
    fn test_ifdef_or_attributes() {
        let mut store = AttributeStore::default();
        store.set("first", true);
        assert!(is_true("ifdef::first,second[]", &store));
        assert!(!is_true("ifdef::second,third[]", &store));
    }

    #[test]
    fn test_ifdef_and_attributes() {
        let mut store = AttributeStore::default();
        store.set("first", true);
        assert!(!is_true("ifdef::first+second[]", &store));
        store.set("second", true);
        assert!(is_true("ifdef::first+second[]", &store));
    }

    #[test]
    fn test_ifndef() {
        let mut store = AttributeStore::default();
        assert!(is_true("ifndef::feature[]", &store));
        store.set("feature", true);
        assert!(!is_true("ifndef::feature[]", &store));
    }

    #[test]
    fn test_unset_attribute_is_not_defined() {
        let mut store = AttributeStore::default();
        store.set("feature", true);
        store.unset("feature");
        assert!(!is_true("ifdef::feature[]", &store));
    }

    #[test]
    fn test_ifeval_arithmetic() {
        let store = AttributeStore::default();
        assert!(is_true("ifeval::[1 + 1 == 2]", &store));
        assert!(is_true("ifeval::[3 > 2]", &store));
        assert!(!is_true("ifeval::[3 <= 2]", &store));
    }

    #[test]
    fn test_ifeval_string_equality() {
        let store = AttributeStore::default();
        assert!(is_true("ifeval::['ASDF' == ASDF]", &store));
    }

    #[test]
    fn test_ifeval_with_attribute_reference() {
        let mut store = AttributeStore::default();
        store.set("level", "3");
        assert!(is_true("ifeval::[{level} >= 2]", &store));
    }

    #[test]
    fn test_ifeval_mismatched_types_is_false_with_diagnostic() {
        let store = AttributeStore::default();
        let conditional = parse_line("ifeval::['one' >= 2]").unwrap();
        let mut diagnostics = Diagnostics::default();
        assert!(!conditional.is_true(&store, &mut diagnostics, 1));
        assert_eq!(diagnostics.into_entries().len(), 1);
    }

    #[test]
    fn test_ifdef_with_content() {
        let conditional = parse_line("ifdef::attribute[Some content here]").unwrap();
        assert_eq!(conditional.content(), Some("Some content here"));
    }

    #[test]
    fn test_endif_forms() {
        assert_eq!(
            parse_endif("endif::attribute[]").unwrap().attribute,
            Some("attribute".to_string())
        );
        assert_eq!(parse_endif("endif::[]").unwrap().attribute, None);
    }
}
