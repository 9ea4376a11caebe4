// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end tests for the `understory_sheet` crate.
//!
//! These drive sheets the way a renderer does: component definitions register
//! with a registry, renders inject through a sheet, and server output is read
//! back into a fresh client.

use std::cell::RefCell;
use std::rc::Rc;

use understory_sheet::{
    BasicStringifier, ComponentStyle, GroupId, Interpolation, Keyframes, MemoryElement, Registry,
    RuleError, RuleSet, Sheet, SheetOptions, StyleElement, parse_style_tags,
};

struct Props {
    color: &'static str,
}

fn containers(html: &str) -> Vec<Box<dyn StyleElement>> {
    parse_style_tags(html, "data-styled")
        .into_iter()
        .map(|el| Box::new(el) as Box<dyn StyleElement>)
        .collect()
}

/// A container the test keeps a handle to after a sheet takes ownership.
#[derive(Clone, Debug, Default)]
struct SharedElement(Rc<RefCell<MemoryElement>>);

impl SharedElement {
    fn new(element: MemoryElement) -> Self {
        Self(Rc::new(RefCell::new(element)))
    }
}

impl StyleElement for SharedElement {
    fn attribute(&self, name: &str) -> Option<String> {
        self.0.borrow().attribute(name)
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        self.0.borrow_mut().set_attribute(name, value);
    }

    fn text_content(&self) -> String {
        self.0.borrow().text_content()
    }

    fn set_text_content(&mut self, text: &str) {
        self.0.borrow_mut().set_text_content(text);
    }

    fn supports_cssom(&self) -> bool {
        self.0.borrow().supports_cssom()
    }

    fn insert_rule(&mut self, rule: &str, index: usize) -> Result<(), RuleError> {
        self.0.borrow_mut().insert_rule(rule, index)
    }

    fn delete_rule(&mut self, index: usize) {
        self.0.borrow_mut().delete_rule(index);
    }

    fn rule_text(&self, index: usize) -> Option<String> {
        self.0.borrow().rule_text(index)
    }

    fn rule_count(&self) -> usize {
        self.0.borrow().rule_count()
    }

    fn remove(&mut self) {
        self.0.borrow_mut().remove();
    }
}

/// Defines the same components, in the same order, against `registry`.
fn define(registry: &Registry) -> (ComponentStyle<Props>, ComponentStyle<Props>) {
    let fade = Keyframes::new("from { opacity: 0; } to { opacity: 1; }");
    let title = ComponentStyle::new(
        RuleSet::new()
            .css("animation: ")
            .push(Interpolation::Keyframes(fade))
            .css(" 1s; font-weight: bold;"),
        registry.generate_component_id("Title"),
        registry,
    );
    let button = ComponentStyle::new(
        RuleSet::new()
            .css("padding: 4px;")
            .dynamic(|p: &Props| format!("color: {};", p.color).into()),
        registry.generate_component_id("Button"),
        registry,
    );
    (title, button)
}

#[test]
fn inserting_the_same_rules_twice_is_idempotent() {
    let registry = Registry::new();
    let (_, button) = define(&registry);
    let mut sheet = Sheet::server(registry);
    let props = Props { color: "red" };

    let first = button.generate_and_inject_styles(&props, &mut sheet, &BasicStringifier);
    let css = sheet.css();
    let second = button.generate_and_inject_styles(&props, &mut sheet, &BasicStringifier);
    assert_eq!(first, second);
    assert_eq!(sheet.css(), css);
    assert_eq!(css.matches(&format!(".{first}{{")).count(), 1);
}

#[test]
fn groups_follow_registration_order_not_render_order() {
    let registry = Registry::new();
    let a = ComponentStyle::new(RuleSet::<()>::new().css("color: red;"), "sc-a", &registry);
    let b = ComponentStyle::new(RuleSet::<()>::new().css("color: blue;"), "sc-b", &registry);
    let mut sheet = Sheet::server(registry.clone());

    let b_name = b.generate_and_inject_styles(&(), &mut sheet, &BasicStringifier);
    let a_name = a.generate_and_inject_styles(&(), &mut sheet, &BasicStringifier);

    assert_eq!(
        sheet.css(),
        format!(".{a_name}{{color:red;}}\n.{b_name}{{color:blue;}}\n")
    );
    assert_eq!(registry.get_group("sc-a"), Some(GroupId::new(0)));
    assert_eq!(registry.get_group("sc-b"), Some(GroupId::new(1)));
}

#[test]
fn clearing_and_reinserting_keeps_neighbours_in_place() {
    let registry = Registry::new();
    for id in ["sc-a", "sc-b", "sc-c"] {
        registry.group_for_id(id);
    }
    let mut sheet = Sheet::new(SheetOptions::default(), registry);
    sheet.set_target(Box::new(MemoryElement::new()));
    let _ = sheet.insert_rules("sc-a", "a", [".a{}"]);
    let _ = sheet.insert_rules("sc-b", "b", [".b{}"]);
    let _ = sheet.insert_rules("sc-c", "c", [".c{}"]);

    sheet.clear_rules("sc-b");
    assert_eq!(sheet.css(), ".a{}\n.c{}\n");
    let _ = sheet.insert_rules("sc-b", "b2", [".b2{}"]);
    assert_eq!(sheet.css(), ".a{}\n.b2{}\n.c{}\n");
    assert_eq!(sheet.tag().map(|t| t.tag().len()), Some(3));
}

#[test]
fn server_output_rehydrates_without_duplicates() {
    let server_registry = Registry::new();
    let (title, button) = define(&server_registry);
    let mut server = Sheet::server(server_registry);
    let red = Props { color: "red" };
    let blue = Props { color: "blue" };
    let title_class = title.generate_and_inject_styles(&red, &mut server, &BasicStringifier);
    let red_class = button.generate_and_inject_styles(&red, &mut server, &BasicStringifier);
    let blue_class = button.generate_and_inject_styles(&blue, &mut server, &BasicStringifier);
    let html = format!("<html><head>{}</head><body></body></html>", server.to_style_tag());

    let client_registry = Registry::new();
    let (title, button) = define(&client_registry);
    let mut client = Sheet::new(SheetOptions::default(), client_registry);
    let summary = client
        .rehydrate_once(containers(&html))
        .expect("first rehydration runs");
    assert!(summary.adopted);
    assert_eq!(summary.groups, 3);

    let mut owned = 0;
    for (_, id) in server.registry().groups() {
        for name in server.names_for_id(&id) {
            assert!(
                client.names_for_id(&id).any(|n| n == name),
                "name `{name}` of `{id}` lost in rehydration"
            );
            owned += 1;
        }
    }
    assert_eq!(owned, server.names().len());
    let css = client.css();
    assert_eq!(css, server.css());

    assert_eq!(title.generate_and_inject_styles(&red, &mut client, &BasicStringifier), title_class);
    assert_eq!(button.generate_and_inject_styles(&red, &mut client, &BasicStringifier), red_class);
    assert_eq!(button.generate_and_inject_styles(&blue, &mut client, &BasicStringifier), blue_class);
    assert_eq!(client.css(), css);

    // New output after rehydration lands at the end of its own group.
    let green = button.generate_and_inject_styles(&Props { color: "green" }, &mut client, &BasicStringifier);
    let group = client.registry().get_group(button.component_id()).expect("button is registered");
    let rules = client.tag().expect("tag exists").group_rules(group);
    assert_eq!(rules.len(), 3);
    assert_eq!(rules[2], format!(".{green}{{padding:4px;color:green;}}"));
    assert!(client.css().lines().last().is_some_and(|l| l.starts_with("@keyframes")));
}

#[test]
fn rehydration_runs_once_per_registry() {
    let mut server = Sheet::server(Registry::new());
    let _ = server.insert_rules("sc-a", "a", [".a{}"]);
    let html = server.to_style_tag();

    let registry = Registry::new();
    let mut first = Sheet::new(SheetOptions::default(), registry.clone());
    assert!(first.rehydrate_once(containers(&html)).is_some());
    let mut second = first.fork();
    assert!(second.rehydrate_once(containers(&html)).is_none());
    assert!(!second.has_name_for_id("sc-a", "a"));
}

#[test]
fn malformed_markup_degrades_to_a_cold_start() {
    let html = "<style data-styled=\"abc\" data-styled-mode=\"text\">.abc{color:red;}</style>";
    let registry = Registry::new();
    let style = ComponentStyle::new(RuleSet::<()>::new().css("color: red;"), "sc-a", &registry);
    let mut client = Sheet::new(SheetOptions::default(), registry);
    let summary = client.rehydrate_once(containers(html)).expect("rehydration runs");
    assert_eq!(summary.skipped, 1);
    assert!(!summary.adopted);
    assert!(client.names().is_empty());

    let name = style.generate_and_inject_styles(&(), &mut client, &BasicStringifier);
    assert_eq!(client.css(), format!(".{name}{{color:red;}}\n"));
}

#[test]
fn forks_are_isolated_but_share_registrations() {
    let registry = Registry::new();
    registry.defer("sc-base", vec![".sc-base{box-sizing:border-box;}".into()]);
    let base = ComponentStyle::new(RuleSet::<()>::new().css("margin: 0;"), "sc-base", &registry);
    let late = ComponentStyle::new(RuleSet::<()>::new().css("margin: 1px;"), "sc-late", &registry);

    let root = Sheet::server(registry.clone());
    let mut one = root.fork();
    let mut two = root.fork();

    let late_name = late.generate_and_inject_styles(&(), &mut one, &BasicStringifier);
    let base_name = base.generate_and_inject_styles(&(), &mut one, &BasicStringifier);
    assert_eq!(
        one.css(),
        format!(".sc-base{{box-sizing:border-box;}}\n.{base_name}{{margin:0;}}\n.{late_name}{{margin:1px;}}\n")
    );

    assert_eq!(two.css(), "");
    assert!(!two.has_name_for_id("sc-base", &base_name));
    let _ = base.generate_and_inject_styles(&(), &mut two, &BasicStringifier);
    assert_eq!(
        two.css(),
        format!(".sc-base{{box-sizing:border-box;}}\n.{base_name}{{margin:0;}}\n")
    );
    assert!(two.registry().ptr_eq(one.registry()));
}

#[test]
fn a_rejected_rule_does_not_break_the_sheet() {
    let registry = Registry::new();
    let broken = ComponentStyle::new(RuleSet::<()>::new().css("color: red;"), "sc-broken", &registry);
    let fine = ComponentStyle::new(RuleSet::<()>::new().css("color: blue;"), "sc-fine", &registry);
    let mut sheet = Sheet::with_target(SheetOptions::default(), registry, Box::new(MemoryElement::new()));

    let bad_stringifier = |css: &str, selector: &str, _: Option<&str>| {
        vec![format!("{selector}{{{css}"), format!("{selector}:hover{{{css}}}")]
    };
    let broken_name = broken.generate_and_inject_styles(&(), &mut sheet, &bad_stringifier);
    let fine_name = fine.generate_and_inject_styles(&(), &mut sheet, &BasicStringifier);

    assert_eq!(
        sheet.css(),
        format!(".{broken_name}:hover{{color: red;}}\n.{fine_name}{{color:blue;}}\n")
    );
}

#[test]
fn environment_switches_select_the_text_medium() {
    let options = SheetOptions::from_lookup(|key| match key {
        "SC_DISABLE_SPEEDY" => Some("true".into()),
        "SC_ATTR" => Some("data-sc".into()),
        _ => None,
    });
    let mut sheet = Sheet::with_target(options, Registry::new(), Box::new(MemoryElement::new()));
    let _ = sheet.insert_rules("sc-a", "a", [".a{}"]);
    assert_eq!(sheet.get_tag().mode(), understory_sheet::InsertMode::Text);
    assert!(sheet.to_style_tag().starts_with("<style data-sc=\"a\" data-sc-version="));
}

#[test]
fn live_text_containers_can_be_read_back() {
    let element = SharedElement::new(MemoryElement::text_only());
    let mut live = Sheet::with_target(
        SheetOptions::default(),
        Registry::new(),
        Box::new(element.clone()),
    );
    let _ = live.insert_rules("sc-a", "abc", [".abc{color:red;}"]);
    let _ = live.insert_rules("sc-b", "def", [".def{top:0;}"]);
    live.clear_rules("sc-b");
    assert_eq!(element.attribute("data-styled").as_deref(), Some("abc"));
    assert_eq!(element.attribute("data-styled-mode").as_deref(), Some("text"));
    assert_eq!(
        element.text_content(),
        "/* sc-component-id:sc-a */\n.abc{color:red;}\n"
    );

    let mut fresh = Sheet::new(SheetOptions::default(), Registry::new());
    let summary = fresh
        .rehydrate_once(vec![Box::new(element.clone())])
        .expect("first rehydration runs");
    assert_eq!(summary.containers, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.rules, 1);
    assert!(summary.adopted);
    assert!(fresh.names_for_id("sc-a").any(|n| n == "abc"));
    assert_eq!(fresh.css(), ".abc{color:red;}\n");

    // The adopted container keeps the same format for the next reader.
    assert_eq!(
        element.text_content(),
        "/* sc-component-id:sc-a */\n.abc{color:red;}\n"
    );
    assert_eq!(element.attribute("data-styled").as_deref(), Some("abc"));
}

#[test]
fn rule_api_containers_list_their_names() {
    let element = SharedElement::new(MemoryElement::new());
    let mut live = Sheet::with_target(
        SheetOptions::default(),
        Registry::new(),
        Box::new(element.clone()),
    );
    let _ = live.insert_rules("sc-a", "abc", [".abc{color:red;}"]);
    let _ = live.insert_rules("sc-a", "abd", [".abd{color:blue;}"]);
    assert_eq!(element.attribute("data-styled").as_deref(), Some("abc abd"));
    assert_eq!(element.0.borrow().rules().len(), 2);

    live.clear_rules("sc-a");
    assert_eq!(element.attribute("data-styled").as_deref(), Some("active"));
    assert_eq!(element.rule_count(), 0);
}
