use filterql::advanced::parse;
use filterql::{Catalog, Expr, Function, Subvariable, compile, resolve};
use proptest::prelude::*;

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}".prop_filter("keywords are not names", |s| {
        !matches!(s.as_str(), "and" | "or" | "not" | "in" | "is")
    })
}

fn arb_operand() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_name(),
        (-1000i64..1000).prop_map(|n| n.to_string()),
        "[a-z ]{0,8}".prop_map(|s| format!("'{s}'")),
    ]
}

fn arb_cmp_op() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("=="),
        Just("!="),
        Just("<"),
        Just("<="),
        Just(">"),
        Just(">="),
    ]
}

fn arb_condition(depth: u32) -> BoxedStrategy<String> {
    let comparison = (arb_name(), arb_cmp_op(), arb_operand())
        .prop_map(|(l, op, r)| format!("{l} {op} {r}"));
    if depth == 0 {
        return comparison.boxed();
    }
    let nested = (
        arb_condition(depth - 1),
        prop_oneof![Just("and"), Just("or")],
        arb_condition(depth - 1),
    )
        .prop_map(|(lhs, op, rhs)| format!("({lhs} {op} {rhs})"));
    let negated = arb_condition(depth - 1).prop_map(|c| format!("not ({c})"));
    prop_oneof![comparison, nested, negated].boxed()
}

fn function_for(op: &str) -> Function {
    match op {
        "==" => Function::Eq,
        "!=" => Function::Ne,
        "<" => Function::Lt,
        "<=" => Function::Le,
        ">" => Function::Gt,
        _ => Function::Ge,
    }
}

fn catalog_for(names: &[&str]) -> Catalog {
    names.iter().fold(Catalog::new(), |catalog, name| {
        catalog.with_array(
            *name,
            format!("vars/{name}"),
            [
                Subvariable::new(format!("{name}__a"), format!("vars/{name}/a")),
                Subvariable::new(format!("{name}__b"), format!("vars/{name}/b")),
            ],
        )
    })
}

proptest! {
    #[test]
    fn parse_display_roundtrip(condition in arb_condition(3)) {
        let parsed = parse(&condition).expect("generated condition should parse");
        let reparsed = parse(&parsed.to_string()).expect("rendered condition should reparse");
        prop_assert_eq!(parsed, reparsed);
    }

    #[test]
    fn generated_conditions_compile(condition in arb_condition(3)) {
        prop_assert!(compile(&condition).is_ok());
    }

    #[test]
    fn comparison_sidedness(a in arb_name(), b in arb_name(), op in arb_cmp_op()) {
        let forward = compile(&format!("{a} {op} {b}")).unwrap();
        let backward = compile(&format!("{b} {op} {a}")).unwrap();
        let function = function_for(op);
        prop_assert_eq!(
            forward,
            Expr::call(function, vec![Expr::variable(a.clone()), Expr::variable(b.clone())])
        );
        prop_assert_eq!(
            backward,
            Expr::call(function, vec![Expr::variable(b), Expr::variable(a)])
        );
    }

    #[test]
    fn and_chains_right_associate(names in prop::collection::vec(arb_name(), 2..6)) {
        let source = names
            .iter()
            .map(|n| format!("{n} == 1"))
            .collect::<Vec<_>>()
            .join(" and ");
        let mut current = compile(&source).unwrap();
        for (i, name) in names.iter().enumerate() {
            let expected_leaf = Expr::call(Function::Eq, vec![Expr::variable(name.clone()), Expr::value(1)]);
            if i == names.len() - 1 {
                prop_assert_eq!(&current, &expected_leaf);
                break;
            }
            let Expr::Call(call) = current else {
                return Err(TestCaseError::fail("expected an and call"));
            };
            prop_assert_eq!(call.function, Function::And);
            prop_assert_eq!(call.args.len(), 2);
            let mut args = call.args.into_iter();
            prop_assert_eq!(args.next(), Some(expected_leaf));
            current = args.next().unwrap();
        }
    }

    #[test]
    fn resolution_is_idempotent(names in prop::collection::hash_set(arb_name(), 1..4), values in prop::collection::vec(0i64..100, 1..4)) {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let catalog = catalog_for(&names);
        let list = values.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");
        let source = names
            .iter()
            .map(|n| format!("{n}.has_any([{list}]) or valid({n})"))
            .collect::<Vec<_>>()
            .join(" and ");

        let resolved = resolve(&compile(&source).unwrap(), &catalog).unwrap();
        prop_assert!(!resolved.has_unresolved());
        prop_assert_eq!(resolve(&resolved, &catalog).unwrap(), resolved);
    }
}
