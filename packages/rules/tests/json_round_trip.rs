//! JSON and text round-trips of rule trees

use scissors_rules::{Rule, RuleTree, Style};
use serde_json::json;

const SHEET: &str = r#"
/* layout */
html, body { margin: 0; padding: 0 }

.card > .title:hover {
    color: #333;
    transition: color .2s ease-in-out;
}

@media screen and (max-width: 480px) {
    .card { padding: 4px !important }
    @media (orientation: portrait) {
        .card { display: none }
    }
}

@-webkit-keyframes pulse {
    from { opacity: 0 }
    50% { opacity: 1 }
    50% { transform: scale(1.1) }
    to { opacity: 0 }
}

@font-face { font-family: Foo; src: url(foo.woff) }
"#;

#[test]
fn test_json_round_trip_preserves_tree() {
    let tree = RuleTree::from_text(SHEET).expect("Should parse");
    assert_eq!(tree.len(), 4, "comment and @font-face are dropped");

    let json = tree.to_json();
    let back = RuleTree::from_structured(&json).expect("Should import");
    assert_eq!(back, tree);
    assert_eq!(back.to_json(), json);
}

#[test]
fn test_json_shape() {
    let tree = RuleTree::from_text("@keyframes k { to { top: 0 } } a { color: red }").unwrap();
    assert_eq!(
        tree.to_json(),
        json!([
            {
                "type": "keyframes",
                "name": "k",
                "vendorPrefix": "",
                "keyframes": [{"keyText": "to", "style": {"top": "0"}}]
            },
            {"type": "rule", "selectorText": "a", "style": {"color": "red"}}
        ])
    );
}

#[test]
fn test_text_round_trip_is_stable() {
    let tree = RuleTree::from_text(SHEET).unwrap();
    let text = tree.to_css();
    let again = RuleTree::from_text(&text).unwrap();
    assert_eq!(again, tree);
    assert_eq!(again.to_css(), text);
}

#[test]
fn test_declaration_order_survives_reparse() {
    let tree = RuleTree::from_text("a { z-index: 2; color: red; background: blue }").unwrap();
    match tree.get(0) {
        Some(Rule::Plain(rule)) => {
            let props: Vec<_> = rule.style.iter().map(|(k, _)| k).collect();
            assert_eq!(props, vec!["z-index", "color", "background"]);
        }
        other => panic!("Expected plain rule, got {:?}", other),
    }
}

#[test]
fn test_serde_and_structured_agree() {
    let tree = RuleTree::from_rules(vec![
        Rule::plain("a", Style::new().with("color", "red")),
        Rule::media("print", vec![Rule::plain("b", Style::new())]),
    ]);
    let json = tree.to_json();
    let via_serde: RuleTree = serde_json::from_value(json.clone()).unwrap();
    let via_structured = RuleTree::from_structured(&json).unwrap();
    assert_eq!(via_serde, via_structured);
}
